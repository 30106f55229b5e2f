//! Error types for the core library.

use thiserror::Error;

use crate::credentials::CredentialError;

/// A mutation the service can refuse.
///
/// Carried by [`Error::Rejected`] so callers can tell which request the
/// service answered with a falsy body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Update of a single member.
    MemberUpdate,
    /// Delete of a single member.
    MemberDelete,
    /// Bulk delete of members by id.
    MemberBulkDelete,
    /// Bulk delete of members by status.
    MemberDeleteByStatus,
    /// Bulk member status change.
    MemberChangeStatus,
    /// Removing members from groups.
    MemberDropGroup,
    /// Opting a member out.
    MemberOptOut,
    /// Replacing a member's group memberships.
    MemberGroupsSave,
    /// Removing a member from some or all groups.
    MemberGroupsDelete,
    /// Update of a field definition.
    FieldUpdate,
    /// Delete of a field definition.
    FieldDelete,
    /// Clearing member data for a field.
    FieldClear,
    /// Update of a group.
    GroupUpdate,
    /// Delete of a group.
    GroupDelete,
    /// Adding members to a group.
    GroupMemberAdd,
    /// Removing members from a group.
    GroupMemberRemove,
    /// Delete of member imports.
    ImportDelete,
    /// Mailing status change.
    MailingUpdate,
    /// Archiving a mailing.
    MailingArchive,
    /// Canceling a scheduled mailing.
    MailingCancel,
    /// Sending a mailing to additional recipients.
    MailingSendAdditional,
    /// Declaring a split-test winner.
    MailingSplitTestWinner,
    /// Forwarding a message.
    MailingForward,
    /// Update of a search.
    SearchUpdate,
    /// Delete of a search.
    SearchDelete,
    /// Update of a trigger.
    TriggerUpdate,
    /// Delete of a trigger.
    TriggerDelete,
    /// Update of a webhook.
    WebHookUpdate,
    /// Delete of one or all webhooks.
    WebHookDelete,
}

impl Operation {
    /// Short description used in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MemberUpdate => "member update",
            Self::MemberDelete => "member delete",
            Self::MemberBulkDelete => "member bulk delete",
            Self::MemberDeleteByStatus => "member delete by status",
            Self::MemberChangeStatus => "member status change",
            Self::MemberDropGroup => "member group removal",
            Self::MemberOptOut => "member opt-out",
            Self::MemberGroupsSave => "member groups save",
            Self::MemberGroupsDelete => "member groups delete",
            Self::FieldUpdate => "field update",
            Self::FieldDelete => "field delete",
            Self::FieldClear => "field clear",
            Self::GroupUpdate => "group update",
            Self::GroupDelete => "group delete",
            Self::GroupMemberAdd => "group member add",
            Self::GroupMemberRemove => "group member remove",
            Self::ImportDelete => "import delete",
            Self::MailingUpdate => "mailing update",
            Self::MailingArchive => "mailing archive",
            Self::MailingCancel => "mailing cancel",
            Self::MailingSendAdditional => "mailing send",
            Self::MailingSplitTestWinner => "split test winner",
            Self::MailingForward => "mailing forward",
            Self::SearchUpdate => "search update",
            Self::SearchDelete => "search delete",
            Self::TriggerUpdate => "trigger update",
            Self::TriggerDelete => "trigger delete",
            Self::WebHookUpdate => "webhook update",
            Self::WebHookDelete => "webhook delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request itself failed.
    #[error("Transport error: {0}")]
    Transport(#[from] emma_transport::Error),

    /// The operation needs an identifier the entity does not carry.
    #[error("{resource} has no {field}")]
    MissingId {
        /// Resource name.
        resource: &'static str,
        /// Identifier field.
        field: &'static str,
    },

    /// A field required by the operation is absent.
    #[error("{resource} is missing required field {field}")]
    MissingField {
        /// Resource name.
        resource: &'static str,
        /// Required field.
        field: &'static str,
    },

    /// The service answered a mutation with a falsy body.
    #[error("Service rejected {0}")]
    Rejected(Operation),

    /// The service rejected submitted content.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Indexed lookup found nothing.
    #[error("{resource} not found: {key}")]
    NotFound {
        /// Resource name.
        resource: &'static str,
        /// Key that was looked up.
        key: String,
    },

    /// The service answered with a shape we cannot use.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(resource: &'static str, key: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            key: key.to_string(),
        }
    }

    /// Whether this is a [`Error::Rejected`] for `operation`.
    #[must_use]
    pub fn is_rejected(&self, operation: Operation) -> bool {
        matches!(self, Self::Rejected(op) if *op == operation)
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
