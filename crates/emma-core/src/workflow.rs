//! Automation workflows. Read-only, keyed by string id.

use emma_transport::{Params, Transport, path_segment};

use crate::collection::{LazyCollection, Resource};
use crate::error::{Error, Result};
use crate::value::{Fields, Schema, WORKFLOW_DATE_FORMAT};

const PATH: &str = "/automation/workflows";

/// An automation workflow.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workflow {
    fields: Fields,
}

impl Resource for Workflow {
    type Key = String;
    const NAME: &'static str = "workflow";
    const ID_FIELD: &'static str = "workflow_id";
    const SCHEMA: Schema = Schema {
        date_fields: &["created_at", "updated_at"],
        date_format: WORKFLOW_DATE_FORMAT,
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

impl Workflow {
    /// Workflow name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get_str("name")
    }

    /// Workflow status, e.g. `active`.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.fields.get_str("status")
    }
}

/// The account's workflows.
pub struct AccountWorkflows<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<Workflow>,
}

impl<'a> AccountWorkflows<'a> {
    pub(crate) fn new(api: &'a dyn Transport, cache: &'a mut LazyCollection<Workflow>) -> Self {
        Self { api, cache }
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Workflow> {
        &*self.cache
    }

    /// Builds a workflow without contacting the service.
    #[must_use]
    pub fn create_entity(&self, fields: Fields) -> Workflow {
        Workflow::from_fields(fields)
    }

    /// Loads every workflow once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self) -> Result<&LazyCollection<Workflow>> {
        self.cache.fetch_all(self.api, PATH, &Params::new())?;
        Ok(&*self.cache)
    }

    /// Looks up one workflow, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_workflow_id(
        &mut self,
        workflow_id: &str,
    ) -> Result<Option<&mut Workflow>> {
        let path = format!("{PATH}/{}", path_segment(workflow_id));
        let key = workflow_id.to_string();
        self.cache.find_one(self.api, &path, &Params::new(), &key)
    }

    /// Indexed access.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such workflow.
    pub fn get(&mut self, workflow_id: &str) -> Result<&mut Workflow> {
        self.find_one_by_workflow_id(workflow_id)?
            .ok_or_else(|| Error::not_found(Workflow::NAME, workflow_id))
    }
}
