//! Mailing entity and its child collections.

use emma_transport::{Params, Transport, is_truthy};
use serde_json::{Value as Json, json};
use tracing::{debug, warn};

use super::message::{MailingMessages, Message};
use crate::collection::{LazyCollection, Related, Resource};
use crate::enumerations::{Code, CodeKind, MailingStatus, MailingStatusUpdate, MailingType};
use crate::error::{Error, Operation, Result};
use crate::group::Group;
use crate::lifecycle;
use crate::member::Member;
use crate::search::Search;
use crate::value::{DATE_FORMAT, Fields, Schema, Value};

pub(crate) const PATH: &str = "/mailings";

/// Extra recipients for [`Mailing::send_additional`].
///
/// Empty lists and `None` are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    /// Individual addresses.
    pub emails: Vec<String>,
    /// Sender override.
    pub sender: Option<String>,
    /// Addresses notified before the send.
    pub heads_up_emails: Vec<String>,
    /// Group ids.
    pub groups: Vec<i64>,
    /// Search ids.
    pub searches: Vec<i64>,
}

impl Recipients {
    fn to_params(&self) -> Params {
        let mut data = Params::new();
        if !self.emails.is_empty() {
            data.insert("recipient_emails".into(), json!(self.emails));
        }
        if let Some(sender) = &self.sender {
            data.insert("sender".into(), json!(sender));
        }
        if !self.heads_up_emails.is_empty() {
            data.insert("heads_up_emails".into(), json!(self.heads_up_emails));
        }
        if !self.groups.is_empty() {
            data.insert("recipient_groups".into(), json!(self.groups));
        }
        if !self.searches.is_empty() {
            data.insert("recipient_searches".into(), json!(self.searches));
        }
        data
    }
}

/// A mailing.
#[derive(Debug, Clone)]
pub struct Mailing {
    fields: Fields,
    groups: LazyCollection<Group>,
    members: LazyCollection<Member>,
    searches: LazyCollection<Search>,
    messages: LazyCollection<Message>,
}

impl Default for Mailing {
    fn default() -> Self {
        Self::from_fields(Fields::new())
    }
}

impl PartialEq for Mailing {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Resource for Mailing {
    type Key = i64;
    const NAME: &'static str = "mailing";
    const ID_FIELD: &'static str = "mailing_id";
    const SCHEMA: Schema = Schema {
        date_fields: &[
            "clicked",
            "opened",
            "delivery_ts",
            "forwarded",
            "shared",
            "sent",
            "send_finished",
            "send_at",
            "archived_ts",
            "send_started",
            "started_or_finished",
        ],
        date_format: DATE_FORMAT,
        coded_fields: &[
            ("mailing_type", CodeKind::MailingType),
            ("mailing_status", CodeKind::MailingStatus),
        ],
        sentinels: &["archived_ts"],
        flatten: None,
    };

    fn from_fields(fields: Fields) -> Self {
        Self {
            fields,
            groups: LazyCollection::keyed_by("group_id"),
            members: LazyCollection::new(),
            searches: LazyCollection::new(),
            messages: LazyCollection::new(),
        }
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }
}

impl Mailing {
    /// Mailing name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get_str("name")
    }

    /// Kind of mailing, when decoded.
    #[must_use]
    pub fn mailing_type(&self) -> Option<MailingType> {
        match self.fields.get_code("mailing_type")? {
            Code::MailingType(kind) => Some(kind),
            _ => None,
        }
    }

    /// Delivery status, when decoded.
    #[must_use]
    pub fn mailing_status(&self) -> Option<MailingStatus> {
        match self.fields.get_code("mailing_status")? {
            Code::MailingStatus(status) => Some(status),
            _ => None,
        }
    }

    /// Moves the mailing to `status` and records the service's answer under
    /// `status`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `mailing_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn update_status(
        &mut self,
        api: &dyn Transport,
        status: MailingStatusUpdate,
    ) -> Result<()> {
        let id = self.require_id()?;
        let body = lifecycle::params([("status", json!(status.as_str()))]);
        let answer = api.put(&format!("{PATH}/{id}"), &body)?;
        if !is_truthy(&answer) {
            warn!("Mailing {id} status change to {} rejected", status.as_str());
            return Err(Error::Rejected(Operation::MailingUpdate));
        }
        self.fields.set("status", Value::from_json(&answer));
        Ok(())
    }

    /// Whether the mailing has been archived.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        lifecycle::is_marked(self, "archived_ts")
    }

    /// Archives the mailing and stamps `archived_ts`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `mailing_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn archive(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::delete(api, self, PATH, Some("archived_ts"), Operation::MailingArchive)
    }

    /// Cancels a pending or paused mailing.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `mailing_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn cancel(&self, api: &dyn Transport) -> Result<()> {
        let id = self.require_id()?;
        if !is_truthy(&api.delete(&format!("{PATH}/cancel/{id}"), &Params::new())?) {
            warn!("Cancelling mailing {id} rejected");
            return Err(Error::Rejected(Operation::MailingCancel));
        }
        Ok(())
    }

    /// Sends this mailing's content to more recipients as a new mailing.
    ///
    /// Returns the new mailing id, or `None` without a request when
    /// `recipients` names nobody.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `mailing_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn send_additional(
        &self,
        api: &dyn Transport,
        recipients: &Recipients,
    ) -> Result<Option<i64>> {
        let id = self.require_id()?;
        let data = recipients.to_params();
        if data.is_empty() {
            return Ok(None);
        }
        let answer = api.post(&format!("{PATH}/{id}"), &data)?;
        if !is_truthy(&answer) {
            warn!("Sending mailing {id} to more recipients rejected");
            return Err(Error::Rejected(Operation::MailingSendAdditional));
        }
        let new_id = lifecycle::created_id(&answer, Self::ID_FIELD).and_then(|v| v.as_i64());
        debug!("Mailing {id} resent as {new_id:?}");
        Ok(new_id)
    }

    /// Addresses notified ahead of the send.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `mailing_id`.
    pub fn get_heads_up_emails(&self, api: &dyn Transport) -> Result<Vec<String>> {
        let id = self.require_id()?;
        match api.get(&format!("{PATH}/{id}/headsup"), &Params::new())? {
            Json::Array(items) => Ok(items
                .iter()
                .filter_map(Json::as_str)
                .map(str::to_string)
                .collect()),
            Json::Null => Ok(Vec::new()),
            other => Err(Error::UnexpectedResponse(format!(
                "expected heads-up addresses, got {other}"
            ))),
        }
    }

    /// Declares split-test variant `winner_id` the winner.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `mailing_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn force_split_test_winner(&self, api: &dyn Transport, winner_id: i64) -> Result<()> {
        let id = self.require_id()?;
        let path = format!("{PATH}/{id}/winner/{winner_id}");
        if !is_truthy(&api.post(&path, &Params::new())?) {
            warn!("Declaring winner {winner_id} for mailing {id} rejected");
            return Err(Error::Rejected(Operation::MailingSplitTestWinner));
        }
        Ok(())
    }

    /// Groups the mailing was sent to, keyed by `group_id`.
    pub fn groups<'a>(&'a mut self, api: &'a dyn Transport) -> Related<'a, Group> {
        Related::new::<Self>(api, PATH, self.id(), "groups", &mut self.groups)
    }

    /// Members the mailing was sent to.
    pub fn members<'a>(&'a mut self, api: &'a dyn Transport) -> Related<'a, Member> {
        Related::new::<Self>(api, PATH, self.id(), "members", &mut self.members)
    }

    /// Searches the mailing was sent to.
    pub fn searches<'a>(&'a mut self, api: &'a dyn Transport) -> Related<'a, Search> {
        Related::new::<Self>(api, PATH, self.id(), "searches", &mut self.searches)
    }

    /// Personalized messages, per member.
    pub fn messages<'a>(&'a mut self, api: &'a dyn Transport) -> MailingMessages<'a> {
        MailingMessages::new(api, self.id(), &mut self.messages)
    }
}
