//! The generic lazy, cache-coherent collection.
//!
//! [`LazyCollection`] is the cache every resource-specific collection is
//! built on. It never contacts the service on its own: the three loading
//! operations take the transport and the request shape from the caller.
//!
//! - [`LazyCollection::fetch_all`] loads the whole collection once. When the
//!   cache already holds anything, it returns it without a request, whatever
//!   the filters.
//! - [`LazyCollection::find_one`] loads a single entry on a cache miss.
//! - [`LazyCollection::merge_from`] always issues its request and merges the
//!   records into the cache (fetch-by-parent).

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

use emma_transport::{Params, Transport, is_truthy};
use serde_json::Value as Json;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::value::{Fields, Schema, Value};

/// Identifier type of a resource.
pub trait Key: Ord + Clone + Debug + Display {
    /// Reads an identifier from a field value.
    fn from_value(value: &Value) -> Option<Self>;

    /// Wire form of the identifier.
    fn to_json(&self) -> Json;
}

impl Key for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn to_json(&self) -> Json {
        Json::from(*self)
    }
}

impl Key for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    fn to_json(&self) -> Json {
        Json::String(self.clone())
    }
}

/// A remote record type held in a [`LazyCollection`].
pub trait Resource: Sized + Clone + Debug {
    /// Identifier type.
    type Key: Key;

    /// Name used in errors and logs.
    const NAME: &'static str;

    /// Field holding the identifier.
    const ID_FIELD: &'static str;

    /// Coercion rules for raw records.
    const SCHEMA: Schema;

    /// Wraps already-decoded fields. Never contacts the service.
    fn from_fields(fields: Fields) -> Self;

    /// The entity's fields.
    fn fields(&self) -> &Fields;

    /// The entity's fields, mutably.
    fn fields_mut(&mut self) -> &mut Fields;

    /// Decodes one raw record.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedResponse` if `raw` is not an object.
    fn from_json(raw: &Json) -> Result<Self> {
        match raw {
            Json::Object(map) => Ok(Self::from_fields(Self::SCHEMA.decode(map))),
            other => Err(Error::UnexpectedResponse(format!(
                "expected {} record, got {other}",
                Self::NAME
            ))),
        }
    }

    /// Identifier, if present.
    fn id(&self) -> Option<Self::Key> {
        self.fields()
            .get(Self::ID_FIELD)
            .and_then(<Self::Key as Key>::from_value)
    }

    /// Identifier, or `Error::MissingId`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` if the identifier field is absent.
    fn require_id(&self) -> Result<Self::Key> {
        self.id().ok_or(Error::MissingId {
            resource: Self::NAME,
            field: Self::ID_FIELD,
        })
    }

    /// Value of a field.
    fn get(&self, key: &str) -> Option<&Value> {
        self.fields().get(key)
    }

    /// Sets a field.
    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields_mut().set(key, value);
    }

    /// Removes a field.
    fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields_mut().remove(key)
    }
}

/// Cache of entities keyed by identifier.
#[derive(Debug, Clone)]
pub struct LazyCollection<E: Resource> {
    entries: BTreeMap<E::Key, E>,
    key_field: &'static str,
}

impl<E: Resource> Default for LazyCollection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Resource> LazyCollection<E> {
    /// Creates an empty collection keyed by the resource's id field.
    #[must_use]
    pub const fn new() -> Self {
        Self::keyed_by(E::ID_FIELD)
    }

    /// Creates an empty collection keyed by another field.
    #[must_use]
    pub const fn keyed_by(key_field: &'static str) -> Self {
        Self {
            entries: BTreeMap::new(),
            key_field,
        }
    }

    /// Field entries are keyed by.
    #[must_use]
    pub const fn key_field(&self) -> &'static str {
        self.key_field
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is cached.
    #[must_use]
    pub fn contains(&self, key: &E::Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached entry for `key`.
    #[must_use]
    pub fn get_cached(&self, key: &E::Key) -> Option<&E> {
        self.entries.get(key)
    }

    /// Cached entry for `key`, mutably.
    pub fn get_cached_mut(&mut self, key: &E::Key) -> Option<&mut E> {
        self.entries.get_mut(key)
    }

    /// Key of `entity` in this collection.
    pub fn key_of(&self, entity: &E) -> Option<E::Key> {
        entity
            .fields()
            .get(self.key_field)
            .and_then(<E::Key as Key>::from_value)
    }

    /// Caches `entity`, replacing any entry with the same key.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` if the entity has no key.
    pub fn insert(&mut self, entity: E) -> Result<Option<E>> {
        let key = self.key_of(&entity).ok_or(Error::MissingId {
            resource: E::NAME,
            field: self.key_field,
        })?;
        Ok(self.entries.insert(key, entity))
    }

    /// Drops `key` from the cache.
    pub fn evict(&mut self, key: &E::Key) -> Option<E> {
        self.entries.remove(key)
    }

    /// Keeps only entries matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&E::Key, &mut E) -> bool) {
        self.entries.retain(|k, v| keep(k, v));
    }

    /// Empties the cache.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&E::Key, &E)> {
        self.entries.iter()
    }

    /// Cached entries, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&E::Key, &mut E)> {
        self.entries.iter_mut()
    }

    /// Cached entities in key order.
    pub fn values(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    /// Cached entities, mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut E> {
        self.entries.values_mut()
    }

    /// Cached keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &E::Key> {
        self.entries.keys()
    }

    /// The whole cache.
    #[must_use]
    pub const fn entries(&self) -> &BTreeMap<E::Key, E> {
        &self.entries
    }

    /// Loads the whole collection unless anything is cached already.
    ///
    /// A warm cache is returned as-is: `params` are ignored and no request is
    /// issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or a record cannot be decoded;
    /// the cache is left untouched in that case.
    pub fn fetch_all(
        &mut self,
        api: &dyn Transport,
        path: &str,
        params: &Params,
    ) -> Result<&BTreeMap<E::Key, E>> {
        if self.entries.is_empty() {
            let body = api.get(path, params)?;
            let records = self.decode_list(&body)?;
            debug!("Loaded {} {} record(s)", records.len(), E::NAME);
            self.entries = records.into_iter().collect();
        } else {
            trace!("{} cache warm, skipping {path}", E::NAME);
        }
        Ok(&self.entries)
    }

    /// Returns the entry for `key`, loading it on a cache miss.
    ///
    /// A falsy response means "absent" and leaves the cache untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the record cannot be decoded.
    pub fn find_one(
        &mut self,
        api: &dyn Transport,
        path: &str,
        params: &Params,
        key: &E::Key,
    ) -> Result<Option<&mut E>> {
        if self.entries.contains_key(key) {
            trace!("{} {key} cache hit", E::NAME);
            return Ok(self.entries.get_mut(key));
        }

        let body = api.get(path, params)?;
        if !is_truthy(&body) {
            debug!("{} {key} not found", E::NAME);
            return Ok(None);
        }

        let entity = E::from_json(&body)?;
        let key = self.key_of(&entity).unwrap_or_else(|| key.clone());
        self.entries.insert(key.clone(), entity);
        Ok(self.entries.get_mut(&key))
    }

    /// Always requests `path` and merges the records into the cache.
    ///
    /// Entries with a matching key are replaced whole; others are added.
    /// Returns the keys that were loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or a record cannot be decoded;
    /// the cache is left untouched in that case.
    pub fn merge_from(
        &mut self,
        api: &dyn Transport,
        path: &str,
        params: &Params,
    ) -> Result<Vec<E::Key>> {
        let body = api.get(path, params)?;
        let records = self.decode_list(&body)?;
        debug!("Merging {} {} record(s) from {path}", records.len(), E::NAME);
        let keys = records.iter().map(|(k, _)| k.clone()).collect();
        self.entries.extend(records);
        Ok(keys)
    }

    /// Merges already-received records into the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be decoded.
    pub fn merge_json(&mut self, body: &Json) -> Result<Vec<E::Key>> {
        let records = self.decode_list(body)?;
        let keys = records.iter().map(|(k, _)| k.clone()).collect();
        self.entries.extend(records);
        Ok(keys)
    }

    fn decode_list(&self, body: &Json) -> Result<Vec<(E::Key, E)>> {
        let items = match body {
            Json::Array(items) => items.as_slice(),
            Json::Null => &[],
            other => {
                return Err(Error::UnexpectedResponse(format!(
                    "expected list of {} records, got {other}",
                    E::NAME
                )));
            }
        };

        items
            .iter()
            .map(|raw| {
                let entity = E::from_json(raw)?;
                let key = self.key_of(&entity).ok_or(Error::MissingId {
                    resource: E::NAME,
                    field: self.key_field,
                })?;
                Ok((key, entity))
            })
            .collect()
    }
}

/// Read-only child collection scoped to one parent entity.
///
/// Loads `{parent path}/{parent id}/{child}` once, like
/// [`LazyCollection::fetch_all`]. An unsaved parent yields
/// `Error::MissingId` before any request.
pub struct Related<'a, E: Resource> {
    api: &'a dyn Transport,
    path: Option<String>,
    parent: (&'static str, &'static str),
    cache: &'a mut LazyCollection<E>,
}

impl<'a, E: Resource> Related<'a, E> {
    pub(crate) fn new<P: Resource>(
        api: &'a dyn Transport,
        parent_path: &str,
        parent_id: Option<P::Key>,
        child: &str,
        cache: &'a mut LazyCollection<E>,
    ) -> Self {
        Self {
            api,
            path: parent_id.map(|id| format!("{parent_path}/{id}/{child}")),
            parent: (P::NAME, P::ID_FIELD),
            cache,
        }
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<E> {
        &*self.cache
    }

    /// Loads the children once.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` for an unsaved parent, or the request error.
    pub fn fetch_all(self) -> Result<&'a LazyCollection<E>> {
        let Self {
            api,
            path,
            parent: (resource, field),
            cache,
        } = self;
        let path = path.ok_or(Error::MissingId { resource, field })?;
        cache.fetch_all(api, &path, &Params::new())?;
        Ok(cache)
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::testing::Widget;
    use super::*;
    use emma_transport::{Call, Method, MockTransport};
    use proptest::prelude::*;
    use serde_json::json;

    fn deleted() -> Params {
        let mut params = Params::new();
        params.insert("deleted".into(), json!(true));
        params
    }

    mod fetch_all_tests {
        use super::*;

        #[test]
        fn cold_cache_issues_one_request() {
            let mock = MockTransport::new();
            mock.expect(json!([{"widget_id": 1}, {"widget_id": 2}]));
            let mut widgets = LazyCollection::<Widget>::new();

            let all = widgets.fetch_all(&mock, "/widgets", &Params::new()).unwrap();
            assert_eq!(all.len(), 2);
            assert_eq!(
                mock.last_call(),
                Some(Call::new(Method::Get, "/widgets", json!({})))
            );
        }

        #[test]
        fn warm_cache_ignores_filters() {
            let mock = MockTransport::new();
            mock.expect(json!([{"widget_id": 1}]));
            let mut widgets = LazyCollection::<Widget>::new();
            widgets.fetch_all(&mock, "/widgets", &Params::new()).unwrap();

            let all = widgets.fetch_all(&mock, "/widgets", &deleted()).unwrap();
            assert_eq!(all.len(), 1);
            assert_eq!(mock.called(), 1);
        }

        #[test]
        fn null_body_is_empty() {
            let mock = MockTransport::new();
            let mut widgets = LazyCollection::<Widget>::new();
            assert!(widgets.fetch_all(&mock, "/widgets", &Params::new()).unwrap().is_empty());
        }

        #[test]
        fn non_list_body_is_unexpected() {
            let mock = MockTransport::new();
            mock.expect(json!({"widget_id": 1}));
            let mut widgets = LazyCollection::<Widget>::new();
            let result = widgets.fetch_all(&mock, "/widgets", &Params::new());
            assert!(matches!(result, Err(Error::UnexpectedResponse(_))));
            assert!(widgets.is_empty());
        }
    }

    mod find_one_tests {
        use super::*;

        #[test]
        fn miss_then_hit() {
            let mock = MockTransport::new();
            mock.expect(json!({"widget_id": 201}));
            let mut widgets = LazyCollection::<Widget>::new();

            let found = widgets
                .find_one(&mock, "/widgets/201", &Params::new(), &201)
                .unwrap();
            assert_eq!(found.unwrap().id(), Some(201));

            widgets
                .find_one(&mock, "/widgets/201", &Params::new(), &201)
                .unwrap();
            assert_eq!(mock.called(), 1);
            assert_eq!(widgets.len(), 1);
        }

        #[test]
        fn absent_leaves_cache_alone() {
            let mock = MockTransport::new();
            let mut widgets = LazyCollection::<Widget>::new();
            let found = widgets
                .find_one(&mock, "/widgets/9", &Params::new(), &9)
                .unwrap();
            assert!(found.is_none());
            assert!(widgets.is_empty());
        }
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn always_requests_and_replaces_matching_entries() {
            let mock = MockTransport::new();
            mock.expect(json!([{"widget_id": 1, "name": "a"}]));
            mock.expect(json!([{"widget_id": 1}, {"widget_id": 2}]));
            let mut widgets = LazyCollection::<Widget>::new();

            widgets.merge_from(&mock, "/parents/5/widgets", &Params::new()).unwrap();
            let keys = widgets
                .merge_from(&mock, "/parents/5/widgets", &Params::new())
                .unwrap();

            assert_eq!(keys, vec![1, 2]);
            assert_eq!(mock.called(), 2);
            assert_eq!(widgets.len(), 2);
            assert!(!widgets.get_cached(&1).unwrap().fields.contains("name"));
        }
    }

    mod related_tests {
        use super::*;

        #[test]
        fn scoped_path_loaded_once() {
            let mock = MockTransport::new();
            mock.expect(json!([{"widget_id": 3}]));
            let mut cache = LazyCollection::<Widget>::new();

            Related::new::<Widget>(&mock, "/parents", Some(5), "widgets", &mut cache)
                .fetch_all()
                .unwrap();
            let related = Related::new::<Widget>(&mock, "/parents", Some(5), "widgets", &mut cache);
            assert!(related.cached().contains(&3));
            related.fetch_all().unwrap();

            assert_eq!(mock.called(), 1);
            assert_eq!(mock.last_call().unwrap().path, "/parents/5/widgets");
        }

        #[test]
        fn unsaved_parent() {
            let mock = MockTransport::new();
            let mut cache = LazyCollection::<Widget>::new();
            let related = Related::new::<Widget>(&mock, "/parents", None, "widgets", &mut cache);
            let err = related.fetch_all().unwrap_err();
            assert!(matches!(err, Error::MissingId { field: "widget_id", .. }));
            assert_eq!(mock.called(), 0);
        }
    }

    #[test]
    fn custom_key_field() {
        let mut widgets = LazyCollection::<Widget>::keyed_by("group_id");
        let entity = Widget::from_fields(Fields::new().with("group_id", 7_i64));
        widgets.insert(entity).unwrap();
        assert!(widgets.contains(&7));
        assert_eq!(widgets.key_field(), "group_id");
    }

    #[test]
    fn insert_without_key_fails() {
        let mut widgets = LazyCollection::<Widget>::new();
        let result = widgets.insert(Widget::from_fields(Fields::new()));
        assert!(matches!(result, Err(Error::MissingId { .. })));
    }

    proptest! {
        #[test]
        fn repeated_lookups_issue_one_request(id in 1_i64..10_000, repeats in 1_usize..6) {
            let mock = MockTransport::new();
            mock.respond_with(json!({"widget_id": id}));
            let mut widgets = LazyCollection::<Widget>::new();
            for _ in 0..repeats {
                widgets.find_one(&mock, "/widgets/x", &Params::new(), &id).unwrap();
            }
            prop_assert_eq!(mock.called(), 1);
        }

        #[test]
        fn warm_fetch_all_never_requests(ids in proptest::collection::btree_set(1_i64..1000, 1..20)) {
            let mock = MockTransport::new();
            let records: Vec<Json> = ids.iter().map(|id| json!({"widget_id": id})).collect();
            mock.expect(Json::Array(records));
            let mut widgets = LazyCollection::<Widget>::new();
            widgets.fetch_all(&mock, "/widgets", &Params::new()).unwrap();
            widgets.fetch_all(&mock, "/widgets", &deleted()).unwrap();
            prop_assert_eq!(mock.called(), 1);
            prop_assert_eq!(widgets.len(), ids.len());
        }
    }
}
