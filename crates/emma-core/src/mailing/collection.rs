//! The account's mailings.

use emma_transport::{Params, Transport, is_truthy};
use serde_json::{Value as Json, json};
use tracing::debug;

use super::model::{Mailing, PATH};
use crate::collection::{LazyCollection, Resource};
use crate::enumerations::{MailingStatus, MailingType};
use crate::error::{Error, Result};
use crate::value::Fields;

/// Filters for [`AccountMailings::fetch_all`].
///
/// Only set flags and non-empty lists are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailingFilter {
    /// Include archived mailings.
    pub include_archived: bool,
    /// Limit to these kinds.
    pub mailing_types: Vec<MailingType>,
    /// Limit to these statuses.
    pub mailing_statuses: Vec<MailingStatus>,
    /// Only scheduled mailings.
    pub is_scheduled: bool,
    /// Include the HTML body.
    pub with_html_body: bool,
    /// Include the plaintext body.
    pub with_plaintext: bool,
}

impl MailingFilter {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        let flags = [
            ("include_archived", self.include_archived),
            ("is_scheduled", self.is_scheduled),
            ("with_html_body", self.with_html_body),
            ("with_plaintext", self.with_plaintext),
        ];
        for (name, on) in flags {
            if on {
                params.insert(name.to_string(), Json::Bool(true));
            }
        }
        if !self.mailing_types.is_empty() {
            let codes: Json = self.mailing_types.iter().map(MailingType::as_code).collect();
            params.insert("mailing_types".into(), codes);
        }
        if !self.mailing_statuses.is_empty() {
            let codes: Json = self
                .mailing_statuses
                .iter()
                .map(MailingStatus::as_code)
                .collect();
            params.insert("mailing_statuses".into(), codes);
        }
        params
    }
}

/// Handle over the account's mailing cache.
pub struct AccountMailings<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<Mailing>,
}

impl<'a> AccountMailings<'a> {
    pub(crate) fn new(api: &'a dyn Transport, cache: &'a mut LazyCollection<Mailing>) -> Self {
        Self { api, cache }
    }

    /// Transport for entity lifecycle calls.
    #[must_use]
    pub fn api(&self) -> &'a dyn Transport {
        self.api
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Mailing> {
        &*self.cache
    }

    /// Builds a mailing without contacting the service.
    #[must_use]
    pub fn create_entity(&self, fields: Fields) -> Mailing {
        Mailing::from_fields(fields)
    }

    /// Loads every mailing once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self, filter: &MailingFilter) -> Result<&LazyCollection<Mailing>> {
        self.cache.fetch_all(self.api, PATH, &filter.to_params())?;
        Ok(&*self.cache)
    }

    /// Looks up one mailing, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_mailing_id(&mut self, mailing_id: i64) -> Result<Option<&mut Mailing>> {
        let path = format!("{PATH}/{mailing_id}");
        self.cache.find_one(self.api, &path, &Params::new(), &mailing_id)
    }

    /// Indexed access.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such mailing.
    pub fn get(&mut self, mailing_id: i64) -> Result<&mut Mailing> {
        self.find_one_by_mailing_id(mailing_id)?
            .ok_or_else(|| Error::not_found(Mailing::NAME, mailing_id))
    }

    /// Checks personalization-tag syntax of the given parts.
    ///
    /// Returns `false` without a request when no part is given.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` with the service's message when it
    /// rejects the content.
    pub fn validate(
        &self,
        html_body: Option<&str>,
        plaintext: Option<&str>,
        subject: Option<&str>,
    ) -> Result<bool> {
        let data: Params = [
            ("html_body", html_body),
            ("plaintext", plaintext),
            ("subject", subject),
        ]
        .into_iter()
        .filter_map(|(key, part)| part.map(|text| (key.to_string(), json!(text))))
        .collect();
        if data.is_empty() {
            return Ok(false);
        }

        match self.api.post(&format!("{PATH}/validate"), &data) {
            Ok(answer) => Ok(is_truthy(&answer)),
            Err(err) if err.is_client_error() => {
                debug!("Mailing content rejected: {err}");
                Err(Error::Validation(err.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
