use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, Result};
use crate::model::{validate, FieldKind, FieldSpec, Schema};
use crate::store::traits::BiobankApi;

/// Status filter accepted by the list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Disabled,
    Enabled,
    Retired,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Disabled => "disabled",
            StatusFilter::Enabled => "enabled",
            StatusFilter::Retired => "retired",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "all" => Ok(StatusFilter::All),
            "disabled" => Ok(StatusFilter::Disabled),
            "enabled" => Ok(StatusFilter::Enabled),
            "retired" => Ok(StatusFilter::Retired),
            other => Err(DomainError::InvalidArgument(format!("invalid status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(DomainError::InvalidArgument(format!("invalid order: {}", other))),
        }
    }
}

/// Options for the paged list endpoints.
///
/// Only these options ever reach the query string. Ranges (`page`, `limit`)
/// and sort field names are checked by the server, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub filter: Option<String>,
    pub status: Option<StatusFilter>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub order: Option<SortOrder>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Build options from a loosely typed map, e.g. UI state.
    ///
    /// `state`, `sortField` and `pageSize` are accepted as aliases. Keys that are not list
    /// options are dropped, and `null` values leave the option unset.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| DomainError::InvalidArgument("list options must be a map".to_string()))?;

        let mut options = ListOptions::default();
        for (key, value) in map {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "filter" => options.filter = Some(as_text(value)),
                "status" | "state" => options.status = Some(StatusFilter::parse(&as_text(value))?),
                "sort" | "sortField" => options.sort = Some(as_text(value)),
                "page" => options.page = Some(as_number(key, value)?),
                "limit" | "pageSize" => options.limit = Some(as_number(key, value)?),
                "order" => options.order = Some(SortOrder::parse(&as_text(value))?),
                other => debug!("dropping unknown list option '{}'", other),
            }
        }
        Ok(options)
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(filter) = &self.filter {
            query.push(("filter".to_string(), filter.clone()));
        }
        if let Some(status) = self.status {
            query.push(("status".to_string(), status.as_str().to_string()));
        }
        if let Some(sort) = &self.sort {
            query.push(("sort".to_string(), sort.clone()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(order) = self.order {
            query.push(("order".to_string(), order.as_str().to_string()));
        }
        query
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(key: &str, value: &Value) -> Result<u32> {
    let number = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| DomainError::InvalidArgument(format!("invalid {}: {}", key, value)))
}

const PAGED_RESULT_SCHEMA: Schema = Schema {
    name: "PagedResult",
    fields: &[
        FieldSpec::required("items", FieldKind::Array(&FieldKind::Any)),
        FieldSpec::required("total", FieldKind::Integer),
        FieldSpec::required("page", FieldKind::Integer),
        FieldSpec::optional("limit", FieldKind::Integer),
        FieldSpec::optional("pageSize", FieldKind::Integer),
        FieldSpec::optional("maxPages", FieldKind::Integer),
    ],
};

/// One page of a larger ordered collection
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub max_pages: u32,
}

impl<T> PagedResult<T> {
    /// Validate a paged reply and build every item with `item_factory`.
    ///
    /// `label` names the collection in errors ("invalid centres from server: ...").
    pub fn create<F>(raw: &Value, label: &str, item_factory: F) -> Result<Self>
    where
        F: Fn(&Value) -> Result<T>,
    {
        let invalid = |detail: String| DomainError::Validation(format!("invalid {} from server: {}", label, detail));

        validate(&PAGED_RESULT_SCHEMA, raw).map_err(|e| invalid(e.to_string()))?;

        let count = |name: &str| -> Result<Option<u64>> {
            match raw.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(value) => value
                    .as_u64()
                    .map(Some)
                    .ok_or_else(|| invalid(format!("{} must not be negative: {}", name, value))),
            }
        };
        let narrow = |name: &str, value: u64| {
            u32::try_from(value).map_err(|_| invalid(format!("{} out of range: {}", name, value)))
        };

        let total = count("total")?.ok_or_else(|| invalid("Missing required property: total".to_string()))?;
        let page = count("page")?.ok_or_else(|| invalid("Missing required property: page".to_string()))?;
        let page = narrow("page", page)?;
        let limit = match count("limit")? {
            Some(limit) => Some(limit),
            None => count("pageSize")?,
        }
        .ok_or_else(|| invalid("Missing required property: limit".to_string()))?;
        let limit = narrow("limit", limit)?;

        let items = raw
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(&item_factory).collect::<Result<Vec<T>>>())
            .unwrap_or_else(|| Ok(Vec::new()))
            .map_err(|e| invalid(e.message().to_string()))?;

        if items.len() as u64 > u64::from(limit) {
            return Err(invalid(format!("{} items exceed page size {}", items.len(), limit)));
        }
        if total < items.len() as u64 {
            return Err(invalid(format!("total {} is less than {} items", total, items.len())));
        }

        let max_pages = match count("maxPages")? {
            Some(max_pages) => narrow("maxPages", max_pages)?,
            None if limit == 0 => 0,
            None => narrow("maxPages", total.div_ceil(u64::from(limit)))?,
        };

        Ok(Self {
            items,
            total,
            page,
            limit,
            max_pages,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.max_pages
    }
}

/// `GET <path>?<options>` and parse the paged reply.
pub async fn list_paged<T, A, F>(
    api: &A,
    path: &str,
    options: &ListOptions,
    label: &str,
    item_factory: F,
) -> Result<PagedResult<T>>
where
    A: BiobankApi + ?Sized,
    F: Fn(&Value) -> Result<T>,
{
    let reply = api.get(path, &options.to_query()).await?;
    PagedResult::create(&reply, label, item_factory)
}
