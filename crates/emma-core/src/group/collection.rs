//! The account's groups.

use emma_transport::{Params, Transport};
use serde_json::{Value as Json, json};

use super::model::{Group, PATH};
use crate::collection::{LazyCollection, Resource};
use crate::enumerations::GroupType;
use crate::error::{Error, Result};
use crate::lifecycle;
use crate::value::Fields;

/// Handle over the account's group cache.
pub struct AccountGroups<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<Group>,
}

impl<'a> AccountGroups<'a> {
    pub(crate) fn new(api: &'a dyn Transport, cache: &'a mut LazyCollection<Group>) -> Self {
        Self { api, cache }
    }

    /// Transport for entity lifecycle calls.
    #[must_use]
    pub fn api(&self) -> &'a dyn Transport {
        self.api
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Group> {
        &*self.cache
    }

    /// Builds a group without contacting the service.
    #[must_use]
    pub fn create_entity(&self, fields: Fields) -> Group {
        Group::from_fields(fields)
    }

    /// Loads every group once, optionally limited to `group_types`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self, group_types: &[GroupType]) -> Result<&LazyCollection<Group>> {
        let params = if group_types.is_empty() {
            Params::new()
        } else {
            let codes: Json = group_types.iter().map(GroupType::as_code).collect();
            lifecycle::params([("group_types", codes)])
        };
        self.cache.fetch_all(self.api, PATH, &params)?;
        Ok(&*self.cache)
    }

    /// Looks up one group, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_group_id(&mut self, group_id: i64) -> Result<Option<&mut Group>> {
        let path = format!("{PATH}/{group_id}");
        self.cache.find_one(self.api, &path, &Params::new(), &group_id)
    }

    /// Indexed access.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such group.
    pub fn get(&mut self, group_id: i64) -> Result<&mut Group> {
        self.find_one_by_group_id(group_id)?
            .ok_or_else(|| Error::not_found(Group::NAME, group_id))
    }

    /// Creates `groups` in one request and caches what the service returns.
    ///
    /// Returns the new group ids. Nothing is sent for an empty list.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` if a group has no name.
    pub fn save(&mut self, groups: &[Group]) -> Result<Vec<i64>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let extracted = groups
            .iter()
            .map(Group::extract)
            .collect::<Result<Vec<_>>>()?;
        let body = lifecycle::params([("groups", json!(extracted))]);
        let added = self.api.post(PATH, &body)?;
        self.cache.merge_json(&added)
    }

    /// Deletes one group and evicts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails; the cache is unchanged then.
    pub fn remove(&mut self, group_id: i64) -> Result<()> {
        let mut group = self.cache.get_cached(&group_id).cloned().unwrap_or_else(|| {
            Group::from_fields(Fields::new().with(Group::ID_FIELD, group_id))
        });
        group.delete(self.api)?;
        self.cache.evict(&group_id);
        Ok(())
    }
}
