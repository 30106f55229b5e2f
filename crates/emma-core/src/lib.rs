//! # emma-core
//!
//! Resource model for the Emma marketing email API.
//!
//! This crate provides:
//! - **Lazy collections** - mapping-like caches that fetch on first access,
//!   answer repeat lookups locally and stay consistent with every mutation
//! - **Resources** - fields, groups, imports, mailings, members, searches,
//!   triggers, webhooks and workflows, each with its account-level handle
//! - **Reports** - uncached response reports per mailing or account
//! - **Root aggregate** - [`Account`], owning the transport and one cache per
//!   resource type
//! - **Configuration** - JSON file or `EMMA_*` environment, private key
//!   optionally kept in the system keyring
//!
//! ## Example
//!
//! ```ignore
//! use emma_core::{Account, MemberStatus};
//!
//! let mut account = Account::new("1234", "public", "private")?;
//! let mut members = account.members();
//! if let Some(member) = members.find_one_by_email("test@example.com", false)? {
//!     println!("{:?}", member.status());
//! }
//! members.change_status_by_status(MemberStatus::Error, MemberStatus::Active, None)?;
//! ```
//!
//! Requests go through an [`emma_transport::Transport`]; tests inject a
//! `MockTransport` with [`Account::with_transport`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod account;
pub mod collection;
mod config;
pub mod credentials;
pub mod enumerations;
mod error;
pub mod field;
pub mod group;
mod lifecycle;
pub mod mailing;
pub mod member;
pub mod member_import;
pub mod report;
pub mod search;
pub mod trigger;
pub mod value;
pub mod webhook;
pub mod workflow;

pub use account::Account;
pub use collection::{Key, LazyCollection, Related, Resource};
pub use config::Config;
pub use credentials::{CredentialError, CredentialResult};
pub use enumerations::{
    Code, CodeKind, DeliveryType, GroupType, ImportStatus, ImportStyle, MailingStatus,
    MailingStatusUpdate, MailingType, MemberStatus, MessagePart,
};
pub use error::{Error, Operation, Result};
pub use field::{AccountFields, Field};
pub use group::{AccountGroups, Group, GroupMembers};
pub use mailing::{
    AccountMailings, Mailing, MailingFilter, MailingMessages, Message, Recipients,
};
pub use member::{AccountMembers, Member, MemberGroups, MemberKey, MemberMailings, SaveOptions};
pub use member_import::{AccountImports, MemberImport};
pub use report::{Report, ReportFilter, get_report};
pub use search::{AccountSearches, Search};
pub use trigger::{AccountTriggers, Trigger};
pub use value::{DATE_FORMAT, Fields, Schema, Value, WORKFLOW_DATE_FORMAT};
pub use webhook::{AccountWebHooks, WebHook};
pub use workflow::{AccountWorkflows, Workflow};

pub use emma_transport::{Params, Transport, is_truthy};
