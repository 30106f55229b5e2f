//! Mailings.
//!
//! Provides the [`Mailing`] entity with its group, member, search and message
//! collections, and the account-level [`AccountMailings`] handle.

mod collection;
mod message;
mod model;

pub use collection::{AccountMailings, MailingFilter};
pub use message::{MailingMessages, Message};
pub use model::{Mailing, Recipients};
