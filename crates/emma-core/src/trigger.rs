//! Automated mailing triggers.

use emma_transport::{Params, Transport};
use serde_json::Value as Json;

use crate::collection::{LazyCollection, Related, Resource};
use crate::error::{Error, Operation, Result};
use crate::lifecycle;
use crate::mailing::Mailing;
use crate::value::{DATE_FORMAT, Fields, Schema};

pub(crate) const PATH: &str = "/triggers";

const MUTABLE: &[&str] = &[
    "name",
    "event_type",
    "parent_mailing_id",
    "groups",
    "links",
    "signups",
    "surveys",
    "field_id",
    "push_offset",
    "is_disabled",
];

/// A trigger.
///
/// The nested `parent_mailing` record is decoded into a [`Mailing`] and kept
/// apart from the trigger's own fields.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    fields: Fields,
    parent_mailing: Option<Mailing>,
    mailings: LazyCollection<Mailing>,
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.parent_mailing == other.parent_mailing
    }
}

impl Resource for Trigger {
    type Key = i64;
    const NAME: &'static str = "trigger";
    const ID_FIELD: &'static str = "trigger_id";
    const SCHEMA: Schema = Schema {
        date_fields: &["deleted_at", "start_ts"],
        date_format: DATE_FORMAT,
        sentinels: &["deleted_at"],
        ..Schema::PLAIN
    };

    fn from_fields(fields: Fields) -> Self {
        Self {
            fields,
            parent_mailing: None,
            mailings: LazyCollection::new(),
        }
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn from_json(raw: &Json) -> Result<Self> {
        let Json::Object(map) = raw else {
            return Err(Error::UnexpectedResponse(format!(
                "expected {} record, got {raw}",
                Self::NAME
            )));
        };
        let mut map = map.clone();
        let parent_mailing = match map.remove("parent_mailing") {
            None | Some(Json::Null) => None,
            Some(parent) => Some(Mailing::from_json(&parent)?),
        };
        Ok(Self {
            parent_mailing,
            ..Self::from_fields(Self::SCHEMA.decode(&map))
        })
    }
}

impl Trigger {
    /// Trigger name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get_str("name")
    }

    /// The mailing this trigger sends, when the record embedded it.
    #[must_use]
    pub const fn parent_mailing(&self) -> Option<&Mailing> {
        self.parent_mailing.as_ref()
    }

    /// Creates the trigger when it has no `trigger_id`, otherwise updates it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses the update.
    pub fn save(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::save(api, self, PATH, MUTABLE, Operation::TriggerUpdate)
    }

    /// Deletes the trigger and stamps `deleted_at`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `trigger_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn delete(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::delete(api, self, PATH, Some("deleted_at"), Operation::TriggerDelete)
    }

    /// Whether the trigger has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        lifecycle::is_marked(self, "deleted_at")
    }

    /// Mailings sent by this trigger.
    pub fn mailings<'a>(&'a mut self, api: &'a dyn Transport) -> Related<'a, Mailing> {
        Related::new::<Self>(api, PATH, self.id(), "mailings", &mut self.mailings)
    }
}

/// The account's triggers.
pub struct AccountTriggers<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<Trigger>,
}

impl<'a> AccountTriggers<'a> {
    pub(crate) fn new(api: &'a dyn Transport, cache: &'a mut LazyCollection<Trigger>) -> Self {
        Self { api, cache }
    }

    /// Transport for entity lifecycle calls.
    #[must_use]
    pub fn api(&self) -> &'a dyn Transport {
        self.api
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Trigger> {
        &*self.cache
    }

    /// Builds a trigger without contacting the service.
    #[must_use]
    pub fn create_entity(&self, fields: Fields) -> Trigger {
        Trigger::from_fields(fields)
    }

    /// Loads every trigger once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self) -> Result<&LazyCollection<Trigger>> {
        self.cache.fetch_all(self.api, PATH, &Params::new())?;
        Ok(&*self.cache)
    }

    /// Looks up one trigger, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_trigger_id(&mut self, trigger_id: i64) -> Result<Option<&mut Trigger>> {
        let path = format!("{PATH}/{trigger_id}");
        self.cache.find_one(self.api, &path, &Params::new(), &trigger_id)
    }

    /// Indexed access.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such trigger.
    pub fn get(&mut self, trigger_id: i64) -> Result<&mut Trigger> {
        self.find_one_by_trigger_id(trigger_id)?
            .ok_or_else(|| Error::not_found(Trigger::NAME, trigger_id))
    }

    /// Saves `trigger` and caches it under its id.
    ///
    /// # Errors
    ///
    /// See [`Trigger::save`].
    pub fn save(&mut self, mut trigger: Trigger) -> Result<i64> {
        trigger.save(self.api)?;
        let id = trigger.require_id()?;
        self.cache.insert(trigger)?;
        Ok(id)
    }

    /// Deletes one trigger and evicts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails; the cache is unchanged then.
    pub fn remove(&mut self, trigger_id: i64) -> Result<()> {
        let mut trigger = self.cache.get_cached(&trigger_id).cloned().unwrap_or_else(|| {
            Trigger::from_fields(Fields::new().with(Trigger::ID_FIELD, trigger_id))
        });
        trigger.delete(self.api)?;
        self.cache.evict(&trigger_id);
        Ok(())
    }
}
