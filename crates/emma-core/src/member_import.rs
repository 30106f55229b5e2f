//! Member imports.

use emma_transport::{Params, Transport, is_truthy};
use serde_json::json;
use tracing::{debug, warn};

use crate::collection::{LazyCollection, Related, Resource};
use crate::enumerations::{Code, CodeKind, ImportStatus, ImportStyle};
use crate::error::{Error, Operation, Result};
use crate::lifecycle;
use crate::member::Member;
use crate::value::{DATE_FORMAT, Fields, Schema};

const PATH: &str = "/members/imports";

/// One bulk import of members.
#[derive(Debug, Clone, Default)]
pub struct MemberImport {
    fields: Fields,
    members: LazyCollection<Member>,
}

impl PartialEq for MemberImport {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Resource for MemberImport {
    type Key = i64;
    const NAME: &'static str = "import";
    const ID_FIELD: &'static str = "import_id";
    const SCHEMA: Schema = Schema {
        date_fields: &["import_started", "import_finished"],
        date_format: DATE_FORMAT,
        coded_fields: &[
            ("status", CodeKind::ImportStatus),
            ("style", CodeKind::ImportStyle),
        ],
        sentinels: &[],
        flatten: None,
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

impl MemberImport {
    /// Outcome of the import, when decoded.
    #[must_use]
    pub fn status(&self) -> Option<ImportStatus> {
        match self.fields.get_code("status")? {
            Code::ImportStatus(status) => Some(status),
            _ => None,
        }
    }

    /// Whether the import only added members, when decoded.
    #[must_use]
    pub fn style(&self) -> Option<ImportStyle> {
        match self.fields.get_code("style")? {
            Code::ImportStyle(style) => Some(style),
            _ => None,
        }
    }

    /// Members touched by the import.
    pub fn members<'a>(&'a mut self, api: &'a dyn Transport) -> Related<'a, Member> {
        Related::new::<Self>(api, PATH, self.id(), "members", &mut self.members)
    }
}

/// The account's imports.
pub struct AccountImports<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<MemberImport>,
}

impl<'a> AccountImports<'a> {
    pub(crate) fn new(api: &'a dyn Transport, cache: &'a mut LazyCollection<MemberImport>) -> Self {
        Self { api, cache }
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<MemberImport> {
        &*self.cache
    }

    /// Loads every import once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self) -> Result<&LazyCollection<MemberImport>> {
        self.cache.fetch_all(self.api, PATH, &Params::new())?;
        Ok(&*self.cache)
    }

    /// Looks up one import, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_import_id(&mut self, import_id: i64) -> Result<Option<&mut MemberImport>> {
        let path = format!("{PATH}/{import_id}");
        self.cache.find_one(self.api, &path, &Params::new(), &import_id)
    }

    /// Indexed access.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such import.
    pub fn get(&mut self, import_id: i64) -> Result<&mut MemberImport> {
        self.find_one_by_import_id(import_id)?
            .ok_or_else(|| Error::not_found(MemberImport::NAME, import_id))
    }

    /// Deletes the imports in `import_ids` and evicts them.
    ///
    /// Nothing is sent for an empty list.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses; the cache is
    /// unchanged then.
    pub fn delete(&mut self, import_ids: &[i64]) -> Result<()> {
        if import_ids.is_empty() {
            return Ok(());
        }
        let params = lifecycle::params([("import_ids", json!(import_ids))]);
        if !is_truthy(&self.api.delete(&format!("{PATH}/delete"), &params)?) {
            warn!("Deleting imports {import_ids:?} rejected");
            return Err(Error::Rejected(Operation::ImportDelete));
        }
        debug!("Deleted {} import(s)", import_ids.len());
        self.cache.retain(|id, _| !import_ids.contains(id));
        Ok(())
    }

    /// Deletes one import and evicts it.
    ///
    /// # Errors
    ///
    /// See [`AccountImports::delete`].
    pub fn remove(&mut self, import_id: i64) -> Result<()> {
        self.delete(&[import_id])
    }
}
