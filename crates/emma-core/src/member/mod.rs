//! Audience members.
//!
//! Provides the [`Member`] entity with its group and mailing collections, and
//! the account-level [`AccountMembers`] handle with the bulk operations.

mod collection;
mod model;

pub use collection::{AccountMembers, MemberKey, SaveOptions};
pub use model::{Member, MemberGroups, MemberMailings};
