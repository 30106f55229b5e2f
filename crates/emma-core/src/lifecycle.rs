//! Create/update/delete shared by the simple entity types.

use chrono::Local;
use emma_transport::{Params, Transport, is_truthy};
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::collection::Resource;
use crate::error::{Error, Result};
use crate::value::Value;

/// Creates or updates `entity` under `collection_path`.
///
/// Without an identifier the entity is POSTed to `collection_path` and the
/// identifier the service answers with is stored. Otherwise only `mutable`
/// keys are PUT to `{collection_path}/{id}`.
pub(crate) fn save<E: Resource>(
    api: &dyn Transport,
    entity: &mut E,
    collection_path: &str,
    mutable: &[&str],
    rejected: crate::Operation,
) -> Result<()> {
    let body = E::SCHEMA.encode_keys(entity.fields(), mutable);
    if let Some(id) = entity.id() {
        let path = format!("{collection_path}/{id}");
        if !is_truthy(&api.put(&path, &body)?) {
            warn!("{} {id} update rejected", E::NAME);
            return Err(Error::Rejected(rejected));
        }
        return Ok(());
    }

    let response = api.post(collection_path, &body)?;
    let id = created_id(&response, E::ID_FIELD).ok_or_else(|| {
        Error::UnexpectedResponse(format!("no {} in create response", E::ID_FIELD))
    })?;
    debug!("Created {} {id:?}", E::NAME);
    entity.fields_mut().set(E::ID_FIELD, id);
    Ok(())
}

/// Reads a new identifier from a create response.
///
/// The service answers with the bare id, or with a record carrying it.
pub(crate) fn created_id(response: &Json, id_field: &str) -> Option<Value> {
    match response {
        Json::Number(_) => Some(Value::from_json(response)),
        Json::String(s) if !s.is_empty() => Some(Value::Text(s.clone())),
        Json::Object(map) => map.get(id_field).filter(|v| !v.is_null()).map(Value::from_json),
        Json::Array(items) => items.first().and_then(|first| created_id(first, id_field)),
        _ => None,
    }
}

/// Deletes `entity` at `{collection_path}/{id}`.
///
/// With a `sentinel`, an already-marked entity is left alone and a successful
/// delete stamps the sentinel with the current time.
pub(crate) fn delete<E: Resource>(
    api: &dyn Transport,
    entity: &mut E,
    collection_path: &str,
    sentinel: Option<&str>,
    rejected: crate::Operation,
) -> Result<()> {
    let id = entity.require_id()?;
    if let Some(marker) = sentinel {
        if entity.fields().is_set(marker) {
            debug!("{} {id} already deleted", E::NAME);
            return Ok(());
        }
    }

    let path = format!("{collection_path}/{id}");
    if !is_truthy(&api.delete(&path, &Params::new())?) {
        warn!("{} {id} delete rejected", E::NAME);
        return Err(Error::Rejected(rejected));
    }
    if let Some(marker) = sentinel {
        entity.fields_mut().set(marker, Local::now().naive_local());
    }
    Ok(())
}

/// Whether `sentinel` marks the entity as deleted.
pub(crate) fn is_marked<E: Resource>(entity: &E, sentinel: &str) -> bool {
    entity.fields().is_set(sentinel)
}

/// Builds params from key/value pairs.
pub(crate) fn params<const N: usize>(pairs: [(&str, Json); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Params carrying `deleted=true` when requested.
pub(crate) fn deleted_params(deleted: bool) -> Params {
    if deleted {
        params([("deleted", Json::Bool(true))])
    } else {
        Params::new()
    }
}
