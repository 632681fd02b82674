use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentreState {
    #[default]
    Disabled,
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyState {
    #[default]
    Disabled,
    Enabled,
    Retired,
}

/// Queries shared by the entity state enums
pub trait EntityStatus {
    fn is_enabled(&self) -> bool;
    fn is_disabled(&self) -> bool;
    fn is_retired(&self) -> bool {
        false
    }
}

impl EntityStatus for CentreState {
    fn is_enabled(&self) -> bool {
        *self == CentreState::Enabled
    }

    fn is_disabled(&self) -> bool {
        *self == CentreState::Disabled
    }
}

impl EntityStatus for StudyState {
    fn is_enabled(&self) -> bool {
        *self == StudyState::Enabled
    }

    fn is_disabled(&self) -> bool {
        *self == StudyState::Disabled
    }

    fn is_retired(&self) -> bool {
        *self == StudyState::Retired
    }
}

/// A state transition requested by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Enable,
    Disable,
    Retire,
    Unretire,
}

impl StateAction {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "enable" => Ok(StateAction::Enable),
            "disable" => Ok(StateAction::Disable),
            "retire" => Ok(StateAction::Retire),
            "unretire" => Ok(StateAction::Unretire),
            other => Err(invalid_state(other)),
        }
    }

    /// Path segment of the state-change command
    pub fn as_str(&self) -> &'static str {
        match self {
            StateAction::Enable => "enable",
            StateAction::Disable => "disable",
            StateAction::Retire => "retire",
            StateAction::Unretire => "unretire",
        }
    }
}

pub fn invalid_state(name: &str) -> DomainError {
    DomainError::InvalidArgument(format!("invalid state: {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_actions() {
        for name in ["enable", "disable", "retire", "unretire"] {
            assert_eq!(StateAction::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_parse_unknown_action() {
        assert_eq!(
            StateAction::parse("archive").unwrap_err(),
            DomainError::InvalidArgument("invalid state: archive".to_string())
        );
    }

    #[test]
    fn test_state_wire_names() {
        assert_eq!(serde_json::to_value(StudyState::Retired).unwrap(), "retired");
        let state: CentreState = serde_json::from_value(serde_json::json!("enabled")).unwrap();
        assert!(state.is_enabled());
        assert!(!state.is_retired());
    }
}
