//! Custom member fields.

use emma_transport::{Params, Transport, is_truthy};
use tracing::warn;

use crate::collection::{LazyCollection, Resource};
use crate::error::{Error, Operation, Result};
use crate::lifecycle::{self, deleted_params};
use crate::value::{Fields, Schema};

const PATH: &str = "/fields";

/// Keys sent when a field definition is saved.
const MUTABLE: &[&str] = &[
    "display_name",
    "field_type",
    "widget_type",
    "column_order",
    "shortcut_name",
    "options",
];

/// A custom field definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Field {
    fields: Fields,
}

impl Resource for Field {
    type Key = i64;
    const NAME: &'static str = "field";
    const ID_FIELD: &'static str = "field_id";
    const SCHEMA: Schema = Schema {
        date_fields: &["deleted_at"],
        sentinels: &["deleted_at"],
        ..Schema::PLAIN
    };

    fn from_fields(fields: Fields) -> Self {
        Self { fields }
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }
}

impl Field {
    /// Creates the field when it has no `field_id`, otherwise updates it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses the update.
    pub fn save(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::save(api, self, PATH, MUTABLE, Operation::FieldUpdate)
    }

    /// Deletes the field and stamps `deleted_at`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `field_id`, or `Error::Rejected`
    /// if the service refuses.
    pub fn delete(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::delete(api, self, PATH, Some("deleted_at"), Operation::FieldDelete)
    }

    /// Whether the field has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        lifecycle::is_marked(self, "deleted_at")
    }

    /// Erases every member's value for this field.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `field_id`, or `Error::Rejected`
    /// if the service refuses.
    pub fn clear_member_information(&self, api: &dyn Transport) -> Result<()> {
        let id = self.require_id()?;
        let path = format!("{PATH}/{id}/clear");
        if !is_truthy(&api.post(&path, &Params::new())?) {
            warn!("Clearing member data for field {id} rejected");
            return Err(Error::Rejected(Operation::FieldClear));
        }
        Ok(())
    }

    /// Shortcut name used as the member data key.
    #[must_use]
    pub fn shortcut_name(&self) -> Option<&str> {
        self.fields.get_str("shortcut_name")
    }
}

/// The account's field definitions.
pub struct AccountFields<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<Field>,
}

impl<'a> AccountFields<'a> {
    pub(crate) fn new(api: &'a dyn Transport, cache: &'a mut LazyCollection<Field>) -> Self {
        Self { api, cache }
    }

    /// Transport for entity lifecycle calls.
    #[must_use]
    pub fn api(&self) -> &'a dyn Transport {
        self.api
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Field> {
        &*self.cache
    }

    /// Builds a field without contacting the service.
    #[must_use]
    pub fn create_entity(&self, fields: Fields) -> Field {
        Field::from_fields(fields)
    }

    /// Loads every field once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self, deleted: bool) -> Result<&LazyCollection<Field>> {
        self.cache.fetch_all(self.api, PATH, &deleted_params(deleted))?;
        Ok(&*self.cache)
    }

    /// Looks up one field, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_field_id(
        &mut self,
        field_id: i64,
        deleted: bool,
    ) -> Result<Option<&mut Field>> {
        let path = format!("{PATH}/{field_id}");
        self.cache
            .find_one(self.api, &path, &deleted_params(deleted), &field_id)
    }

    /// Indexed access; includes deleted fields.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such field.
    pub fn get(&mut self, field_id: i64) -> Result<&mut Field> {
        self.find_one_by_field_id(field_id, true)?
            .ok_or_else(|| Error::not_found(Field::NAME, field_id))
    }

    /// Shortcut names of every field.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields cannot be loaded.
    pub fn export_shortcuts(&mut self) -> Result<Vec<String>> {
        Ok(self
            .fetch_all(false)?
            .values()
            .filter_map(Field::shortcut_name)
            .map(str::to_string)
            .collect())
    }

    /// Deletes one field and evicts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails; the cache is unchanged then.
    pub fn remove(&mut self, field_id: i64) -> Result<()> {
        let mut field = self
            .cache
            .get_cached(&field_id)
            .cloned()
            .unwrap_or_else(|| Field::from_fields(Fields::new().with("field_id", field_id)));
        field.delete(self.api)?;
        self.cache.evict(&field_id);
        Ok(())
    }
}
