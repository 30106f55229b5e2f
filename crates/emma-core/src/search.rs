//! Saved member searches.

use emma_transport::Transport;

use crate::collection::{LazyCollection, Related, Resource};
use crate::error::{Error, Operation, Result};
use crate::lifecycle::{self, deleted_params};
use crate::member::Member;
use crate::value::{DATE_FORMAT, Fields, Schema};

pub(crate) const PATH: &str = "/searches";

const MUTABLE: &[&str] = &["name", "criteria"];

/// A saved search.
#[derive(Debug, Clone, Default)]
pub struct Search {
    fields: Fields,
    members: LazyCollection<Member>,
}

impl PartialEq for Search {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Resource for Search {
    type Key = i64;
    const NAME: &'static str = "search";
    const ID_FIELD: &'static str = "search_id";
    const SCHEMA: Schema = Schema {
        date_fields: &["deleted_at", "last_run_at"],
        date_format: DATE_FORMAT,
        sentinels: &["deleted_at"],
        ..Schema::PLAIN
    };

    fn from_fields(fields: Fields) -> Self {
        Self {
            fields,
            members: LazyCollection::new(),
        }
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }
}

impl Search {
    /// Search name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get_str("name")
    }

    /// Creates the search when it has no `search_id`, otherwise updates its
    /// name and criteria.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses the update.
    pub fn save(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::save(api, self, PATH, MUTABLE, Operation::SearchUpdate)
    }

    /// Deletes the search and stamps `deleted_at`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `search_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn delete(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::delete(api, self, PATH, Some("deleted_at"), Operation::SearchDelete)
    }

    /// Whether the search has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        lifecycle::is_marked(self, "deleted_at")
    }

    /// Members matching the search.
    pub fn members<'a>(&'a mut self, api: &'a dyn Transport) -> Related<'a, Member> {
        Related::new::<Self>(api, PATH, self.id(), "members", &mut self.members)
    }
}

/// The account's saved searches.
pub struct AccountSearches<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<Search>,
}

impl<'a> AccountSearches<'a> {
    pub(crate) fn new(api: &'a dyn Transport, cache: &'a mut LazyCollection<Search>) -> Self {
        Self { api, cache }
    }

    /// Transport for entity lifecycle calls.
    #[must_use]
    pub fn api(&self) -> &'a dyn Transport {
        self.api
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Search> {
        &*self.cache
    }

    /// Builds a search without contacting the service.
    #[must_use]
    pub fn create_entity(&self, fields: Fields) -> Search {
        Search::from_fields(fields)
    }

    /// Loads every search once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self, deleted: bool) -> Result<&LazyCollection<Search>> {
        self.cache.fetch_all(self.api, PATH, &deleted_params(deleted))?;
        Ok(&*self.cache)
    }

    /// Looks up one search, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_search_id(
        &mut self,
        search_id: i64,
        deleted: bool,
    ) -> Result<Option<&mut Search>> {
        let path = format!("{PATH}/{search_id}");
        self.cache
            .find_one(self.api, &path, &deleted_params(deleted), &search_id)
    }

    /// Indexed access.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such search.
    pub fn get(&mut self, search_id: i64) -> Result<&mut Search> {
        self.find_one_by_search_id(search_id, false)?
            .ok_or_else(|| Error::not_found(Search::NAME, search_id))
    }

    /// Saves `search` and caches it under its id.
    ///
    /// # Errors
    ///
    /// See [`Search::save`].
    pub fn save(&mut self, mut search: Search) -> Result<i64> {
        search.save(self.api)?;
        let id = search.require_id()?;
        self.cache.insert(search)?;
        Ok(id)
    }

    /// Deletes one search and evicts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails; the cache is unchanged then.
    pub fn remove(&mut self, search_id: i64) -> Result<()> {
        let mut search = self.cache.get_cached(&search_id).cloned().unwrap_or_else(|| {
            Search::from_fields(Fields::new().with(Search::ID_FIELD, search_id))
        });
        search.delete(self.api)?;
        self.cache.evict(&search_id);
        Ok(())
    }
}
