use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DomainError, Result};
use crate::model::{merge_fields, uri, validate, Id, Schema};
use crate::store::traits::BiobankApi;

/// Identity, version and audit timestamps shared by every versioned entity.
///
/// Concrete entities embed this with `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencySafeEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    #[serde(default)]
    pub version: u64,

    #[serde(default)]
    pub time_added: Option<DateTime<Utc>>,

    #[serde(default)]
    pub time_modified: Option<DateTime<Utc>>,
}

impl ConcurrencySafeEntity {
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// The id of a persisted entity; new entities have none to send.
    pub fn persisted_id(&self) -> Result<&Id> {
        self.id.as_ref().ok_or_else(DomainError::entity_is_new)
    }

    /// `fields` plus the `expectedVersion` the server must still hold.
    pub fn update_command(&self, fields: Value) -> Result<Value> {
        self.persisted_id()?;
        Ok(merge_fields(fields, json!({ "expectedVersion": self.version })))
    }

    /// Body for commands that carry nothing but the expected version.
    pub fn version_command(&self) -> Result<Value> {
        self.update_command(json!({}))
    }
}

/// Capability set of a server-backed entity with optimistic concurrency.
pub trait DomainEntity: DeserializeOwned + Send + Sync + Sized {
    const SCHEMA: &'static Schema;

    fn entity(&self) -> &ConcurrencySafeEntity;

    /// Validate a raw server object and build an entity from it.
    fn create(raw: &Value) -> Result<Self> {
        parse(Self::SCHEMA, raw)
    }

    fn id(&self) -> Option<&Id> {
        self.entity().id.as_ref()
    }

    fn version(&self) -> u64 {
        self.entity().version
    }

    fn is_new(&self) -> bool {
        self.entity().is_new()
    }

    fn time_added(&self) -> Option<DateTime<Utc>> {
        self.entity().time_added
    }

    fn time_modified(&self) -> Option<DateTime<Utc>> {
        self.entity().time_modified
    }
}

/// Schema-check `raw` and deserialize it.
pub fn parse<T: DeserializeOwned>(schema: &Schema, raw: &Value) -> Result<T> {
    if let Err(err) = validate(schema, raw) {
        debug!("{} rejected: {}", schema.name, err);
        return Err(err.into());
    }
    serde_json::from_value(raw.clone()).map_err(DomainError::invalid_object)
}

pub async fn fetch<T, A>(api: &A, path: &str, query: &[(String, String)]) -> Result<T>
where
    T: DomainEntity,
    A: BiobankApi + ?Sized,
{
    let reply = api.get(path, query).await?;
    T::create(&reply)
}

/// Fetch a plain (non-paged) array of entities.
pub async fn fetch_all<T, A, F>(api: &A, path: &str, query: &[(String, String)], factory: F) -> Result<Vec<T>>
where
    A: BiobankApi + ?Sized,
    F: Fn(&Value) -> Result<T>,
{
    let reply = api.get(path, query).await?;
    let items = reply
        .as_array()
        .ok_or_else(|| DomainError::invalid_object("expected an array"))?;
    items.iter().map(factory).collect()
}

pub async fn post_command<T, A>(api: &A, path: &str, cmd: Value) -> Result<T>
where
    T: DomainEntity,
    A: BiobankApi + ?Sized,
{
    debug!("POST {} {}", path, cmd);
    let reply = api.post(path, cmd).await?;
    T::create(&reply)
}

pub async fn put_command<T, A>(api: &A, path: &str, cmd: Value) -> Result<T>
where
    T: DomainEntity,
    A: BiobankApi + ?Sized,
{
    debug!("PUT {} {}", path, cmd);
    let reply = api.put(path, cmd).await?;
    T::create(&reply)
}

/// DELETE that replies with the refreshed parent entity (nested removals).
pub async fn delete_command<T, A>(api: &A, path: &str) -> Result<T>
where
    T: DomainEntity,
    A: BiobankApi + ?Sized,
{
    debug!("DELETE {}", path);
    let reply = api.delete(path).await?;
    T::create(&reply)
}

/// `PUT /<collection>/<field>/<id>` with `fields` and the expected version.
pub async fn update_field<T, A>(api: &A, entity: &T, collection: &str, field: &str, fields: Value) -> Result<T>
where
    T: DomainEntity,
    A: BiobankApi + ?Sized,
{
    let base = entity.entity();
    let id = base.persisted_id()?;
    let cmd = base.update_command(fields)?;
    put_command(api, &uri(&[collection, field, id]), cmd).await
}

/// `POST /<collection>/<action>/<id>` with only the expected version.
pub async fn change_state<T, A>(api: &A, entity: &T, collection: &str, action: &str) -> Result<T>
where
    T: DomainEntity,
    A: BiobankApi + ?Sized,
{
    let base = entity.entity();
    let id = base.persisted_id()?;
    let cmd = base.version_command()?;
    post_command(api, &uri(&[collection, action, id]), cmd).await
}

/// Version path segment used by DELETE commands.
pub fn version_segment(entity: &ConcurrencySafeEntity) -> String {
    entity.version.to_string()
}
