//! The account's members and the bulk member endpoints.

use emma_transport::{Params, Transport, is_truthy, path_segment};
use serde_json::{Value as Json, json};
use tracing::{debug, warn};

use super::model::Member;
use crate::collection::{LazyCollection, Resource};
use crate::enumerations::MemberStatus;
use crate::error::{Error, Operation, Result};
use crate::field::{AccountFields, Field};
use crate::lifecycle::{self, deleted_params};
use crate::value::Fields;

const PATH: &str = "/members";

/// How a member is looked up by [`AccountMembers::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKey {
    /// By `member_id`.
    Id(i64),
    /// By email address.
    Email(String),
}

impl From<i64> for MemberKey {
    fn from(value: i64) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for MemberKey {
    fn from(value: &str) -> Self {
        Self::Email(value.to_string())
    }
}

impl From<String> for MemberKey {
    fn from(value: String) -> Self {
        Self::Email(value)
    }
}

/// Options for [`AccountMembers::save`].
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Label stored with the resulting import.
    pub filename: Option<String>,
    /// Only add new members; cached members are not resent.
    pub add_only: bool,
    /// Groups every imported member joins.
    pub group_ids: Vec<i64>,
}

/// Handle over the account's member cache.
pub struct AccountMembers<'a> {
    api: &'a dyn Transport,
    cache: &'a mut LazyCollection<Member>,
    fields: &'a mut LazyCollection<Field>,
}

impl<'a> AccountMembers<'a> {
    pub(crate) fn new(
        api: &'a dyn Transport,
        cache: &'a mut LazyCollection<Member>,
        fields: &'a mut LazyCollection<Field>,
    ) -> Self {
        Self { api, cache, fields }
    }

    /// Transport for entity lifecycle calls.
    #[must_use]
    pub fn api(&self) -> &'a dyn Transport {
        self.api
    }

    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Member> {
        &*self.cache
    }

    /// Builds a member without contacting the service.
    #[must_use]
    pub fn create_entity(&self, fields: Fields) -> Member {
        Member::from_fields(fields)
    }

    /// Shortcut names of the account's custom fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields cannot be loaded.
    pub fn shortcuts(&mut self) -> Result<Vec<String>> {
        AccountFields::new(self.api, &mut *self.fields).export_shortcuts()
    }

    /// Loads every member once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all(&mut self, deleted: bool) -> Result<&LazyCollection<Member>> {
        self.cache.fetch_all(self.api, PATH, &deleted_params(deleted))?;
        Ok(&*self.cache)
    }

    /// Loads the members of an import, merging them into the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all_by_import_id(&mut self, import_id: i64) -> Result<Vec<&Member>> {
        self.merge(&format!("{PATH}/imports/{import_id}/members"), &Params::new())
    }

    /// Loads the members of a group, merging them into the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all_by_group_id(
        &mut self,
        group_id: i64,
        deleted: bool,
    ) -> Result<Vec<&Member>> {
        self.merge(
            &format!("{}/{group_id}/members", crate::group::PATH),
            &deleted_params(deleted),
        )
    }

    /// Loads the members matching a saved search, merging them into the
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn fetch_all_by_search_id(&mut self, search_id: i64) -> Result<Vec<&Member>> {
        self.merge(&format!("/searches/{search_id}/members"), &Params::new())
    }

    fn merge(&mut self, path: &str, params: &Params) -> Result<Vec<&Member>> {
        let keys = self.cache.merge_from(self.api, path, params)?;
        let cache = &*self.cache;
        Ok(keys.iter().filter_map(|k| cache.get_cached(k)).collect())
    }

    /// Looks up one member, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn find_one_by_member_id(
        &mut self,
        member_id: i64,
        deleted: bool,
    ) -> Result<Option<&mut Member>> {
        let path = format!("{PATH}/{member_id}");
        self.cache
            .find_one(self.api, &path, &deleted_params(deleted), &member_id)
    }

    /// Looks up one member by email, scanning the cache before asking the
    /// service.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the record has no id.
    pub fn find_one_by_email(
        &mut self,
        email: &str,
        deleted: bool,
    ) -> Result<Option<&mut Member>> {
        let cached = self
            .cache
            .values()
            .find(|m| m.email() == Some(email))
            .and_then(Resource::id);
        if let Some(id) = cached {
            return Ok(self.cache.get_cached_mut(&id));
        }

        let path = format!("{PATH}/email/{}", path_segment(email));
        let body = self.api.get(&path, &deleted_params(deleted))?;
        if !is_truthy(&body) {
            debug!("No member with email {email}");
            return Ok(None);
        }
        let member = Member::from_json(&body)?;
        let id = member.require_id()?;
        self.cache.insert(member)?;
        Ok(self.cache.get_cached_mut(&id))
    }

    /// Indexed access by id or email.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the service has no such member.
    pub fn get(&mut self, key: impl Into<MemberKey>) -> Result<&mut Member> {
        match key.into() {
            MemberKey::Id(id) => self
                .find_one_by_member_id(id, false)?
                .ok_or_else(|| Error::not_found(Member::NAME, id)),
            MemberKey::Email(email) => self
                .find_one_by_email(&email, false)?
                .ok_or_else(|| Error::not_found(Member::NAME, email)),
        }
    }

    /// Imports `members`, plus every cached member unless `add_only`.
    ///
    /// Returns the service's answer (the import id), or `None` without a
    /// request when there is nothing to send.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` if a member has no email, or the request
    /// error.
    pub fn save(&mut self, members: &[Member], options: &SaveOptions) -> Result<Option<Json>> {
        if members.is_empty() && (options.add_only || self.cache.is_empty()) {
            return Ok(None);
        }

        let shortcuts = self.shortcuts()?;
        let cached = self.cache.values().filter(|_| !options.add_only);
        let extracted = members
            .iter()
            .chain(cached)
            .map(|m| m.extract(&shortcuts))
            .collect::<Result<Vec<_>>>()?;

        let mut data = lifecycle::params([("members", json!(extracted))]);
        if options.add_only {
            data.insert("add_only".into(), json!(true));
        }
        if let Some(filename) = &options.filename {
            data.insert("filename".into(), json!(filename));
        }
        if !options.group_ids.is_empty() {
            data.insert("group_ids".into(), json!(options.group_ids));
        }
        Ok(Some(self.api.post(PATH, &data)?))
    }

    /// Deletes members by id and evicts them.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses; the cache is
    /// unchanged then.
    pub fn delete(&mut self, member_ids: &[i64]) -> Result<()> {
        if member_ids.is_empty() {
            return Ok(());
        }
        let body = lifecycle::params([("member_ids", json!(member_ids))]);
        if !is_truthy(&self.api.put(&format!("{PATH}/delete"), &body)?) {
            warn!("Bulk delete of {} member(s) rejected", member_ids.len());
            return Err(Error::Rejected(Operation::MemberBulkDelete));
        }
        self.cache.retain(|id, _| !member_ids.contains(id));
        Ok(())
    }

    /// Deletes every member with `status` and evicts them.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn delete_by_status(&mut self, status: MemberStatus) -> Result<()> {
        let params = lifecycle::params([("member_status_id", json!(status.as_code()))]);
        if !is_truthy(&self.api.delete(PATH, &params)?) {
            warn!("Delete of {} members rejected", status.name());
            return Err(Error::Rejected(Operation::MemberDeleteByStatus));
        }
        self.cache.retain(|_, m| m.status() != Some(status));
        Ok(())
    }

    /// Moves members to `status_to` (active when `None`).
    ///
    /// Only the listed members' cached status changes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn change_status_by_member_id(
        &mut self,
        member_ids: &[i64],
        status_to: Option<MemberStatus>,
    ) -> Result<()> {
        if member_ids.is_empty() {
            return Ok(());
        }
        let status = status_to.unwrap_or_default();
        let body = lifecycle::params([
            ("member_ids", json!(member_ids)),
            ("status_to", json!(status.as_code())),
        ]);
        if !is_truthy(&self.api.put(&format!("{PATH}/status"), &body)?) {
            warn!("Status change of {} member(s) rejected", member_ids.len());
            return Err(Error::Rejected(Operation::MemberChangeStatus));
        }
        for id in member_ids {
            if let Some(member) = self.cache.get_cached_mut(id) {
                member.set_status(status);
            }
        }
        Ok(())
    }

    /// Moves every member with status `old` to `new`, optionally only within
    /// `group_id`.
    ///
    /// Without a group filter, cached members with status `old` are updated;
    /// with one, the cache cannot tell group membership and is left alone.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn change_status_by_status(
        &mut self,
        old: MemberStatus,
        new: MemberStatus,
        group_id: Option<i64>,
    ) -> Result<()> {
        let path = format!("{PATH}/status/{}/to/{}", old.as_code(), new.as_code());
        let body = group_id.map_or_else(Params::new, |id| {
            lifecycle::params([("group_id", json!(id))])
        });
        if !is_truthy(&self.api.put(&path, &body)?) {
            warn!("Status change {} -> {} rejected", old.name(), new.name());
            return Err(Error::Rejected(Operation::MemberChangeStatus));
        }
        if group_id.is_none() {
            for member in self.cache.values_mut() {
                if member.status() == Some(old) {
                    member.set_status(new);
                }
            }
        }
        Ok(())
    }

    /// Removes `member_ids` from `group_ids`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Rejected` if the service refuses.
    pub fn drop_groups(&mut self, member_ids: &[i64], group_ids: &[i64]) -> Result<()> {
        if member_ids.is_empty() || group_ids.is_empty() {
            return Ok(());
        }
        let body = lifecycle::params([
            ("member_ids", json!(member_ids)),
            ("group_ids", json!(group_ids)),
        ]);
        if !is_truthy(&self.api.put(&format!("{PATH}/groups/remove"), &body)?) {
            warn!("Dropping groups for {} member(s) rejected", member_ids.len());
            return Err(Error::Rejected(Operation::MemberDropGroup));
        }
        for id in member_ids {
            if let Some(member) = self.cache.get_cached_mut(id) {
                member
                    .groups_cache_mut()
                    .retain(|group_id, _| !group_ids.contains(group_id));
            }
        }
        Ok(())
    }

    /// Deletes one member and evicts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails; the cache is unchanged then.
    pub fn remove(&mut self, member_id: i64) -> Result<()> {
        let mut member = self.cache.get_cached(&member_id).cloned().unwrap_or_else(|| {
            Member::from_fields(Fields::new().with(Member::ID_FIELD, member_id))
        });
        member.delete(self.api)?;
        self.cache.evict(&member_id);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emma_transport::{Call, Method, MockTransport};

    struct Caches {
        members: LazyCollection<Member>,
        fields: LazyCollection<Field>,
    }

    impl Caches {
        fn new() -> Self {
            Self {
                members: LazyCollection::new(),
                fields: LazyCollection::new(),
            }
        }

        fn handle<'a>(&'a mut self, mock: &'a MockTransport) -> AccountMembers<'a> {
            AccountMembers::new(mock, &mut self.members, &mut self.fields)
        }
    }

    fn warm(mock: &MockTransport, caches: &mut Caches) {
        mock.expect(json!([
            {"member_id": 200, "email": "emma@example.com", "member_status_id": "a"},
            {"member_id": 201, "email": "emmb@example.com", "member_status_id": "a"},
            {"member_id": 202, "email": "emmc@example.com", "member_status_id": "e"},
        ]));
        caches.handle(mock).fetch_all(false).unwrap();
        mock.reset_calls();
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn find_by_email_scans_cache_first() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            let mut members = caches.handle(&mock);
            let found = members
                .find_one_by_email("emmb@example.com", false)
                .unwrap();
            assert_eq!(found.unwrap().id(), Some(201));
            assert_eq!(mock.called(), 0);
        }

        #[test]
        fn find_by_email_asks_service() {
            let mock = MockTransport::new();
            mock.expect(json!({"member_id": 300, "email": "new@example.com"}));
            let mut caches = Caches::new();
            let mut members = caches.handle(&mock);
            members.find_one_by_email("new@example.com", true).unwrap();
            assert!(members.cached().contains(&300));
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Get,
                    "/members/email/new%40example.com",
                    json!({"deleted": true})
                ))
            );
        }

        #[test]
        fn get_by_key_kind() {
            let mock = MockTransport::new();
            mock.expect(json!({"member_id": 200, "email": "emma@example.com"}));
            let mut caches = Caches::new();
            let mut members = caches.handle(&mock);
            assert_eq!(members.get(200_i64).unwrap().email(), Some("emma@example.com"));
            assert_eq!(members.get("emma@example.com").unwrap().id(), Some(200));
            assert_eq!(mock.called(), 1);
            assert!(matches!(
                members.get("nobody@example.com"),
                Err(Error::NotFound { .. })
            ));
        }
    }

    mod fetch_by_parent_tests {
        use super::*;

        #[test]
        fn always_requests_and_merges() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.respond_with(json!([{"member_id": 200, "email": "changed@example.com"}]));
            let mut members = caches.handle(&mock);

            members.fetch_all_by_group_id(1024, false).unwrap();
            let merged = members.fetch_all_by_group_id(1024, false).unwrap();

            assert_eq!(merged.len(), 1);
            assert_eq!(mock.called(), 2);
            assert_eq!(members.cached().len(), 3);
            assert_eq!(
                members.cached().get_cached(&200).unwrap().email(),
                Some("changed@example.com")
            );
        }

        #[test]
        fn paths() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            let mut members = caches.handle(&mock);
            members.fetch_all_by_import_id(1024).unwrap();
            members.fetch_all_by_search_id(1025).unwrap();
            let paths: Vec<String> = mock.calls().into_iter().map(|c| c.path).collect();
            assert_eq!(
                paths,
                vec!["/members/imports/1024/members", "/searches/1025/members"]
            );
        }
    }

    mod save_tests {
        use super::*;

        #[test]
        fn nothing_to_send() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            let outcome = caches.handle(&mock).save(&[], &SaveOptions::default());
            assert!(outcome.unwrap().is_none());
            assert_eq!(mock.called(), 0);
        }

        #[test]
        fn add_only_ignores_cache() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            let options = SaveOptions {
                add_only: true,
                ..SaveOptions::default()
            };
            assert!(caches.handle(&mock).save(&[], &options).unwrap().is_none());
            assert_eq!(mock.called(), 0);
        }

        #[test]
        fn sends_explicit_and_cached_members() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.expect(json!([]));
            mock.expect(json!({"import_id": 1024}));
            let mut members = caches.handle(&mock);
            let new = members.create_entity(Fields::new().with("email", "new@example.com"));
            let options = SaveOptions {
                filename: Some("test.csv".into()),
                group_ids: vec![300],
                ..SaveOptions::default()
            };

            let outcome = members.save(&[new], &options).unwrap();

            assert_eq!(outcome, Some(json!({"import_id": 1024})));
            let call = mock.last_call().unwrap();
            assert_eq!(call.path, "/members");
            assert_eq!(call.params["members"].as_array().unwrap().len(), 4);
            assert_eq!(call.params["filename"], json!("test.csv"));
            assert_eq!(call.params["group_ids"], json!([300]));
            assert!(!call.params.contains_key("add_only"));
        }
    }

    mod bulk_tests {
        use super::*;

        #[test]
        fn empty_delete_is_a_no_op() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            let mut members = caches.handle(&mock);
            members.delete(&[]).unwrap();
            members.change_status_by_member_id(&[], None).unwrap();
            members.drop_groups(&[200], &[]).unwrap();
            members.drop_groups(&[], &[300]).unwrap();
            assert_eq!(mock.called(), 0);
        }

        #[test]
        fn rejected_delete_keeps_cache() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.expect(json!(false));
            let mut members = caches.handle(&mock);

            let err = members.delete(&[200, 201]).unwrap_err();

            assert!(err.is_rejected(Operation::MemberBulkDelete));
            assert!(members.cached().contains(&200));
            assert!(members.cached().contains(&201));
        }

        #[test]
        fn delete_evicts() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.expect(json!(true));
            let mut members = caches.handle(&mock);
            members.delete(&[200, 201]).unwrap();
            assert_eq!(members.cached().keys().copied().collect::<Vec<_>>(), vec![202]);
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Put,
                    "/members/delete",
                    json!({"member_ids": [200, 201]})
                ))
            );
        }

        #[test]
        fn delete_by_status_evicts_matching() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.expect(json!(true));
            let mut members = caches.handle(&mock);
            members.delete_by_status(MemberStatus::Error).unwrap();
            assert_eq!(members.cached().len(), 2);
            assert!(!members.cached().contains(&202));
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Delete,
                    "/members",
                    json!({"member_status_id": "e"})
                ))
            );
        }

        #[test]
        fn status_change_touches_listed_members_only() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.expect(json!(true));
            let mut members = caches.handle(&mock);

            members
                .change_status_by_member_id(&[200], Some(MemberStatus::OptOut))
                .unwrap();

            let status = |id: i64| members.cached().get_cached(&id).unwrap().status();
            assert_eq!(status(200), Some(MemberStatus::OptOut));
            assert_eq!(status(201), Some(MemberStatus::Active));
            assert_eq!(status(202), Some(MemberStatus::Error));
        }

        #[test]
        fn status_change_defaults_to_active() {
            let mock = MockTransport::new();
            mock.expect(json!(true));
            let mut caches = Caches::new();
            caches.handle(&mock).change_status_by_member_id(&[202], None).unwrap();
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Put,
                    "/members/status",
                    json!({"member_ids": [202], "status_to": "a"})
                ))
            );
        }

        #[test]
        fn status_change_by_status() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.expect(json!(true));
            let mut members = caches.handle(&mock);

            members
                .change_status_by_status(MemberStatus::Error, MemberStatus::Active, None)
                .unwrap();

            assert_eq!(
                members.cached().get_cached(&202).unwrap().status(),
                Some(MemberStatus::Active)
            );
            assert_eq!(mock.last_call().unwrap().path, "/members/status/e/to/a");
        }

        #[test]
        fn status_change_by_status_within_group_leaves_cache() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.expect(json!(true));
            let mut members = caches.handle(&mock);

            members
                .change_status_by_status(MemberStatus::Error, MemberStatus::Active, Some(1024))
                .unwrap();

            assert_eq!(
                members.cached().get_cached(&202).unwrap().status(),
                Some(MemberStatus::Error)
            );
            assert_eq!(mock.last_call().unwrap().params["group_id"], json!(1024));
        }

        #[test]
        fn status_change_rejected() {
            let mock = MockTransport::new();
            mock.expect(json!(false));
            let mut caches = Caches::new();
            let err = caches
                .handle(&mock)
                .change_status_by_member_id(&[200], None)
                .unwrap_err();
            assert!(err.is_rejected(Operation::MemberChangeStatus));
        }

        #[test]
        fn drop_groups_rejected() {
            let mock = MockTransport::new();
            mock.expect(json!(0));
            let mut caches = Caches::new();
            let err = caches
                .handle(&mock)
                .drop_groups(&[200], &[300])
                .unwrap_err();
            assert!(err.is_rejected(Operation::MemberDropGroup));
            assert_eq!(mock.last_call().unwrap().path, "/members/groups/remove");
        }

        #[test]
        fn remove_evicts() {
            let mock = MockTransport::new();
            let mut caches = Caches::new();
            warm(&mock, &mut caches);
            mock.expect(json!(true));
            let mut members = caches.handle(&mock);
            members.remove(201).unwrap();
            assert!(!members.cached().contains(&201));
            assert_eq!(mock.last_call().unwrap().path, "/members/201");
        }
    }
}
