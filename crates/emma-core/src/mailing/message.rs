//! Per-member personalized messages of a mailing.

use emma_transport::{Params, Transport, is_truthy};
use serde_json::json;
use tracing::warn;

use crate::collection::{LazyCollection, Resource};
use crate::enumerations::MessagePart;
use crate::error::{Error, Operation, Result};
use crate::lifecycle;
use crate::value::{Fields, Schema};

/// One member's copy of a mailing.
///
/// Carries the `mailing_id` and `member_id` it was loaded for next to the
/// message parts (`html_body`, `plaintext`, `subject`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    fields: Fields,
}

impl Resource for Message {
    type Key = i64;
    const NAME: &'static str = "message";
    const ID_FIELD: &'static str = "member_id";
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

impl Message {
    fn stamp(&mut self, mailing_id: i64, member_id: i64) {
        if !self.fields.is_set("mailing_id") {
            self.fields.set("mailing_id", mailing_id);
        }
        if !self.fields.is_set("member_id") {
            self.fields.set("member_id", member_id);
        }
    }

    /// Forwards this message to `recipients`, with an optional `note`.
    ///
    /// Returns the id of the forward mailing, or `None` without a request
    /// when there are no recipients.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `mailing_id` or `member_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn forward(
        &self,
        api: &dyn Transport,
        recipients: &[String],
        note: Option<&str>,
    ) -> Result<Option<i64>> {
        let mailing_id = self.fields.get_i64("mailing_id").ok_or(Error::MissingId {
            resource: "mailing",
            field: "mailing_id",
        })?;
        let member_id = self.require_id()?;
        if recipients.is_empty() {
            return Ok(None);
        }

        let mut body = lifecycle::params([("recipient_emails", json!(recipients))]);
        if let Some(note) = note {
            body.insert("note".into(), json!(note));
        }
        let answer = api.post(&format!("/forwards/{mailing_id}/{member_id}"), &body)?;
        if !is_truthy(&answer) {
            warn!("Forwarding mailing {mailing_id} from member {member_id} rejected");
            return Err(Error::Rejected(Operation::MailingForward));
        }
        Ok(lifecycle::created_id(&answer, "mailing_id").and_then(|v| v.as_i64()))
    }
}

/// Messages of one mailing, keyed by member.
pub struct MailingMessages<'a> {
    api: &'a dyn Transport,
    mailing_id: Option<i64>,
    cache: &'a mut LazyCollection<Message>,
}

impl<'a> MailingMessages<'a> {
    pub(crate) fn new(
        api: &'a dyn Transport,
        mailing_id: Option<i64>,
        cache: &'a mut LazyCollection<Message>,
    ) -> Self {
        Self {
            api,
            mailing_id,
            cache,
        }
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Message> {
        &*self.cache
    }

    /// Loads the message `member_id` received, limited to `part` when given.
    ///
    /// The cache is keyed by member only, so a message cached for one part is
    /// returned for any other.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` for an unsaved mailing, or the request
    /// error.
    pub fn find_one_by_member_id(
        &mut self,
        member_id: i64,
        part: Option<MessagePart>,
    ) -> Result<Option<&mut Message>> {
        let mailing_id = self.mailing_id.ok_or(Error::MissingId {
            resource: "mailing",
            field: "mailing_id",
        })?;
        let path = format!("/mailings/{mailing_id}/messages/{member_id}");
        let params = part.map_or_else(Params::new, |part| {
            lifecycle::params([("type", json!(part.as_str()))])
        });
        let found = self.cache.find_one(self.api, &path, &params, &member_id)?;
        Ok(found.map(|message| {
            message.stamp(mailing_id, member_id);
            message
        }))
    }

    /// Indexed access.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the member received no such message.
    pub fn get(&mut self, member_id: i64) -> Result<&mut Message> {
        self.find_one_by_member_id(member_id, None)?
            .ok_or_else(|| Error::not_found(Message::NAME, member_id))
    }
}
