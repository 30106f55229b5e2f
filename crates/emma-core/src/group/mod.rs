//! Audience groups.
//!
//! Provides the [`Group`] entity, its [`GroupMembers`] child collection and
//! the account-level [`AccountGroups`] handle.

mod collection;
mod model;

pub use collection::AccountGroups;
pub use model::{Group, GroupMembers};

pub(crate) use model::PATH;
