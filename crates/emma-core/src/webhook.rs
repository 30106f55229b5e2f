//! Event webhooks.

use emma_transport::{Params, Transport, is_truthy};
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::collection::{LazyCollection, Resource};
use crate::error::{Error, Operation, Result};
use crate::lifecycle;
use crate::value::{Fields, Schema};

const PATH: &str = "/webhooks";

const MUTABLE: &[&str] = &["url", "event", "method", "public_key"];

/// A webhook registration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WebHook {
    fields: Fields,
}

impl Resource for WebHook {
    type Key = i64;
    const NAME: &'static str = "webhook";
    const ID_FIELD: &'static str = "webhook_id";
    const SCHEMA: Schema = Schema::PLAIN;

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

impl WebHook {
    /// Callback URL.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.fields.get_str("url")
    }

    /// Event name the hook fires on.
    #[must_use]
    pub fn event(&self) -> Option<&str> {
        self.fields.get_str("event")
    }

    /// Registers the hook when it has no `webhook_id`, otherwise updates it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses the update.
    pub fn save(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::save(api, self, PATH, MUTABLE, Operation::WebHookUpdate)
    }

    /// Unregisters the hook. Webhooks keep no deletion marker.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `webhook_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn delete(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::delete(api, self, PATH, None, Operation::WebHookDelete)
    }
}

/// The account's webhooks.
pub struct AccountWebHooks<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<WebHook>,
}

impl<'a> AccountWebHooks<'a> {
    pub(crate) fn new(api: &'a dyn Transport, cache: &'a mut LazyCollection<WebHook>) -> Self {
        Self { api, cache }
    }

    /// Transport for entity lifecycle calls.
    #[must_use]
    pub fn api(&self) -> &'a dyn Transport {
        self.api
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<WebHook> {
        &*self.cache
    }

    /// Builds a webhook without contacting the service.
    #[must_use]
    pub fn create_entity(&self, fields: Fields) -> WebHook {
        WebHook::from_fields(fields)
    }

    /// Loads every webhook once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self) -> Result<&LazyCollection<WebHook>> {
        self.cache.fetch_all(self.api, PATH, &Params::new())?;
        Ok(&*self.cache)
    }

    /// Looks up one webhook, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_webhook_id(&mut self, webhook_id: i64) -> Result<Option<&mut WebHook>> {
        let path = format!("{PATH}/{webhook_id}");
        self.cache.find_one(self.api, &path, &Params::new(), &webhook_id)
    }

    /// Indexed access.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such webhook.
    pub fn get(&mut self, webhook_id: i64) -> Result<&mut WebHook> {
        self.find_one_by_webhook_id(webhook_id)?
            .ok_or_else(|| Error::not_found(WebHook::NAME, webhook_id))
    }

    /// Saves `webhook` and caches it under its id.
    ///
    /// # Errors
    ///
    /// See [`WebHook::save`].
    pub fn save(&mut self, mut webhook: WebHook) -> Result<i64> {
        webhook.save(self.api)?;
        let id = webhook.require_id()?;
        self.cache.insert(webhook)?;
        Ok(id)
    }

    /// Deletes one webhook and evicts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails; the cache is unchanged then.
    pub fn remove(&mut self, webhook_id: i64) -> Result<()> {
        let mut webhook = self.cache.get_cached(&webhook_id).cloned().unwrap_or_else(|| {
            WebHook::from_fields(Fields::new().with(WebHook::ID_FIELD, webhook_id))
        });
        webhook.delete(self.api)?;
        self.cache.evict(&webhook_id);
        Ok(())
    }

    /// Unregisters every webhook of the account and empties the cache.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses; the cache is
    /// unchanged then.
    pub fn delete_all(&mut self) -> Result<()> {
        if !is_truthy(&self.api.delete(PATH, &Params::new())?) {
            warn!("Deleting all webhooks rejected");
            return Err(Error::Rejected(Operation::WebHookDelete));
        }
        debug!("Deleted all webhooks, dropping {} cached", self.cache.len());
        self.cache.clear();
        Ok(())
    }

    /// Event types a webhook can subscribe to.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn list_events(&self) -> Result<Vec<Json>> {
        match self.api.get(&format!("{PATH}/events"), &Params::new())? {
            Json::Array(events) => Ok(events),
            Json::Null => Ok(Vec::new()),
            other => Err(Error::UnexpectedResponse(format!(
                "expected webhook events, got {other}"
            ))),
        }
    }
}
