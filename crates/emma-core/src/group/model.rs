//! Group entity and its member collection.

use emma_transport::{Params, Transport, is_truthy};
use serde_json::{Value as Json, json};
use tracing::{debug, warn};

use crate::collection::{LazyCollection, Resource};
use crate::enumerations::{CodeKind, MemberStatus};
use crate::error::{Error, Operation, Result};
use crate::lifecycle::{self, deleted_params};
use crate::member::Member;
use crate::value::{Fields, Schema};

pub(crate) const PATH: &str = "/groups";

/// An audience group.
#[derive(Debug, Clone, Default)]
pub struct Group {
    fields: Fields,
    members: LazyCollection<Member>,
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Resource for Group {
    type Key = i64;
    const NAME: &'static str = "group";
    const ID_FIELD: &'static str = "member_group_id";
    const SCHEMA: Schema = Schema {
        date_fields: &["deleted_at"],
        coded_fields: &[("group_type", CodeKind::GroupType)],
        sentinels: &["deleted_at"],
        ..Schema::PLAIN
    };

    fn from_fields(fields: Fields) -> Self {
        Self {
            fields,
            members: LazyCollection::new(),
        }
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }
}

impl Group {
    /// Group name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get_str("group_name")
    }

    /// Wire form accepted by the create and update endpoints.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` without a `group_name`.
    pub fn extract(&self) -> Result<Params> {
        if !self.fields.contains("group_name") {
            return Err(Error::MissingField {
                resource: Self::NAME,
                field: "group_name",
            });
        }
        Ok(Self::SCHEMA.encode_keys(&self.fields, &["group_name"]))
    }

    /// Creates the group when it has no `member_group_id`, otherwise renames
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` without a `group_name`, or
    /// `Error::Rejected` if the service refuses the update.
    pub fn save(&mut self, api: &dyn Transport) -> Result<()> {
        let data = self.extract()?;
        if let Some(id) = self.id() {
            if !is_truthy(&api.put(&format!("{PATH}/{id}"), &data)?) {
                warn!("Group {id} update rejected");
                return Err(Error::Rejected(Operation::GroupUpdate));
            }
            return Ok(());
        }

        let body = lifecycle::params([("groups", json!([data]))]);
        let added = api.post(PATH, &body)?;
        let id = lifecycle::created_id(&added, Self::ID_FIELD).ok_or_else(|| {
            Error::UnexpectedResponse("no member_group_id in create response".into())
        })?;
        debug!("Created group {id:?}");
        self.fields.set(Self::ID_FIELD, id);
        Ok(())
    }

    /// Deletes the group and stamps `deleted_at`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `member_group_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn delete(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::delete(api, self, PATH, Some("deleted_at"), Operation::GroupDelete)
    }

    /// Whether the group has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        lifecycle::is_marked(self, "deleted_at")
    }

    /// Members of this group.
    pub fn members<'a>(&'a mut self, api: &'a dyn Transport) -> GroupMembers<'a> {
        GroupMembers {
            api,
            group_id: self.id(),
            cache: &mut self.members,
        }
    }
}

/// Members of one group.
pub struct GroupMembers<'a> {
    api: &'a dyn Transport,
    group_id: Option<i64>,
    cache: &'a mut LazyCollection<Member>,
}

impl GroupMembers<'_> {
    fn group_id(&self) -> Result<i64> {
        self.group_id.ok_or(Error::MissingId {
            resource: Group::NAME,
            field: Group::ID_FIELD,
        })
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Member> {
        &*self.cache
    }

    /// Loads the group's members once.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` for an unsaved group, or the request error.
    pub fn fetch_all(&mut self, deleted: bool) -> Result<&LazyCollection<Member>> {
        let path = format!("{PATH}/{}/members", self.group_id()?);
        self.cache.fetch_all(self.api, &path, &deleted_params(deleted))?;
        Ok(&*self.cache)
    }

    /// Adds members by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn add_by_id(&mut self, member_ids: &[i64]) -> Result<()> {
        let group_id = self.group_id()?;
        if member_ids.is_empty() {
            return Ok(());
        }
        let path = format!("{PATH}/{group_id}/members");
        self.put(&path, &lifecycle::params([("member_ids", json!(member_ids))]))
    }

    /// Copies every member with one of `statuses` into the group.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn add_by_status(&mut self, statuses: &[MemberStatus]) -> Result<()> {
        let group_id = self.group_id()?;
        if statuses.is_empty() {
            return Ok(());
        }
        let path = format!("/members/{group_id}/copy");
        self.put(&path, &lifecycle::params([("member_status_id", codes(statuses))]))
    }

    /// Copies the members of `source_group_id`, optionally limited to
    /// `statuses`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn add_by_group(
        &mut self,
        source_group_id: i64,
        statuses: &[MemberStatus],
    ) -> Result<()> {
        let group_id = self.group_id()?;
        let path = format!("{PATH}/{source_group_id}/{group_id}/members/copy");
        let data = if statuses.is_empty() {
            Params::new()
        } else {
            lifecycle::params([("member_status_id", codes(statuses))])
        };
        self.put(&path, &data)
    }

    /// Removes members by id, evicting those the service reports removed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn remove_by_id(&mut self, member_ids: &[i64]) -> Result<()> {
        let group_id = self.group_id()?;
        if member_ids.is_empty() {
            return Ok(());
        }
        let path = format!("{PATH}/{group_id}/members/remove");
        let body = lifecycle::params([("member_ids", json!(member_ids))]);
        let removed = self.api.put(&path, &body)?;
        if !is_truthy(&removed) {
            warn!("Removing members from group {group_id} rejected");
            return Err(Error::Rejected(Operation::GroupMemberRemove));
        }
        if let Json::Array(ids) = removed {
            for id in ids.iter().filter_map(Json::as_i64) {
                self.cache.evict(&id);
            }
        }
        Ok(())
    }

    /// Removes every member, or only those with `status`.
    ///
    /// The cache is cleared either way.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn remove_all(&mut self, status: Option<MemberStatus>) -> Result<()> {
        let group_id = self.group_id()?;
        let path = format!("{PATH}/{group_id}/members");
        let params = status.map_or_else(Params::new, |s| {
            lifecycle::params([("member_status_id", json!(s.as_code()))])
        });
        if !is_truthy(&self.api.delete(&path, &params)?) {
            warn!("Removing all members from group {group_id} rejected");
            return Err(Error::Rejected(Operation::GroupMemberRemove));
        }
        self.cache.clear();
        Ok(())
    }

    fn put(&self, path: &str, data: &Params) -> Result<()> {
        if !is_truthy(&self.api.put(path, data)?) {
            warn!("Adding members via {path} rejected");
            return Err(Error::Rejected(Operation::GroupMemberAdd));
        }
        Ok(())
    }
}

fn codes(statuses: &[MemberStatus]) -> Json {
    statuses.iter().map(MemberStatus::as_code).collect()
}
