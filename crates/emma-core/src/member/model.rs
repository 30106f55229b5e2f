//! Member entity and its child collections.

use emma_transport::{Params, Transport, is_truthy, path_segment};
use serde_json::{Value as Json, json};
use tracing::{debug, warn};

use crate::collection::{LazyCollection, Related, Resource};
use crate::enumerations::{Code, CodeKind, MemberStatus};
use crate::error::{Error, Operation, Result};
use crate::group::Group;
use crate::lifecycle;
use crate::mailing::Mailing;
use crate::value::{DATE_FORMAT, Fields, Schema, Value};

const PATH: &str = "/members";

/// An audience member.
///
/// Custom field values arrive nested under `fields` and are flattened into
/// the member's own fields; [`Member::extract`] nests them again.
#[derive(Debug, Clone, Default)]
pub struct Member {
    fields: Fields,
    groups: LazyCollection<Group>,
    mailings: LazyCollection<Mailing>,
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Resource for Member {
    type Key = i64;
    const NAME: &'static str = "member";
    const ID_FIELD: &'static str = "member_id";
    const SCHEMA: Schema = Schema {
        date_fields: &["last_modified_at", "member_since", "deleted_at"],
        date_format: DATE_FORMAT,
        coded_fields: &[("member_status_id", CodeKind::MemberStatus)],
        sentinels: &["deleted_at"],
        flatten: Some("fields"),
    };

    fn from_fields(fields: Fields) -> Self {
        Self {
            fields,
            groups: LazyCollection::new(),
            mailings: LazyCollection::new(),
        }
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }
}

impl Member {
    /// Email address.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.fields.get_str("email")
    }

    /// Current status, if known.
    #[must_use]
    pub fn status(&self) -> Option<MemberStatus> {
        match self.fields.get("member_status_id")? {
            Value::Code(Code::MemberStatus(status)) => Some(*status),
            Value::Text(text) => MemberStatus::parse(text),
            _ => None,
        }
    }

    /// Sets the status.
    pub fn set_status(&mut self, status: MemberStatus) {
        self.fields.set("member_status_id", status);
    }

    fn require_email(&self) -> Result<&str> {
        self.email().ok_or(Error::MissingField {
            resource: Self::NAME,
            field: "email",
        })
    }

    /// Wire form: `member_id`, `email`, and the custom fields named in
    /// `shortcuts` nested under `fields`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` without an email.
    pub fn extract(&self, shortcuts: &[String]) -> Result<Params> {
        self.require_email()?;
        let mut extracted = Self::SCHEMA.encode_keys(&self.fields, &["member_id", "email"]);
        let custom: Params = self
            .fields
            .iter()
            .filter(|(key, _)| shortcuts.contains(key))
            .map(|(key, value)| (key.clone(), value.to_json(DATE_FORMAT)))
            .collect();
        if !custom.is_empty() {
            extracted.insert("fields".into(), Json::Object(custom));
        }
        Ok(extracted)
    }

    /// Adds the member when it has no `member_id`, otherwise updates it.
    ///
    /// `signup_form_id` and `group_ids` only apply to a new member.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` without an email, or `Error::Rejected`
    /// if the service refuses the update.
    pub fn save(
        &mut self,
        api: &dyn Transport,
        shortcuts: &[String],
        signup_form_id: Option<i64>,
        group_ids: &[i64],
    ) -> Result<()> {
        let mut data = self.extract(shortcuts)?;
        let Some(id) = self.id() else {
            return self.add(api, data, signup_form_id, group_ids);
        };

        if let Some(status) = self.status().filter(MemberStatus::is_assignable) {
            data.insert("status_to".into(), json!(status.as_code()));
        }
        if !is_truthy(&api.put(&format!("{PATH}/{id}"), &data)?) {
            warn!("Member {id} update rejected");
            return Err(Error::Rejected(Operation::MemberUpdate));
        }
        Ok(())
    }

    fn add(
        &mut self,
        api: &dyn Transport,
        mut data: Params,
        signup_form_id: Option<i64>,
        group_ids: &[i64],
    ) -> Result<()> {
        if !group_ids.is_empty() {
            data.insert("group_ids".into(), json!(group_ids));
        }
        if let Some(form) = signup_form_id {
            data.insert("signup_form_id".into(), json!(form));
        }

        let outcome = match api.post(&format!("{PATH}/add"), &data)? {
            Json::Object(outcome) => outcome,
            other => {
                return Err(Error::UnexpectedResponse(format!(
                    "expected member add outcome, got {other}"
                )));
            }
        };
        if let Some(status) = outcome.get("status") {
            let status = Self::SCHEMA.decode_value("member_status_id", status);
            self.fields.set("member_status_id", status);
        }
        if let Some(id) = outcome.get("member_id").filter(|v| !v.is_null()) {
            debug!("Added member {id}");
            self.fields.set(Self::ID_FIELD, Value::from_json(id));
        }
        Ok(())
    }

    /// Deletes the member and stamps `deleted_at`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `member_id`, or
    /// `Error::Rejected` if the service refuses.
    pub fn delete(&mut self, api: &dyn Transport) -> Result<()> {
        lifecycle::delete(api, self, PATH, Some("deleted_at"), Operation::MemberDelete)
    }

    /// Whether the member has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        lifecycle::is_marked(self, "deleted_at")
    }

    /// Opts the member out of future mailings.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` without an email, or `Error::Rejected`
    /// if the service refuses.
    pub fn opt_out(&mut self, api: &dyn Transport) -> Result<()> {
        let path = format!(
            "{PATH}/email/optout/{}",
            path_segment(self.require_email()?)
        );
        if !is_truthy(&api.put(&path, &Params::new())?) {
            warn!("Opt-out via {path} rejected");
            return Err(Error::Rejected(Operation::MemberOptOut));
        }
        self.set_status(MemberStatus::OptOut);
        Ok(())
    }

    /// Opt-out history. Empty, without a request, unless the member has
    /// opted out.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` without a `member_id`.
    pub fn get_opt_out_detail(&self, api: &dyn Transport) -> Result<Vec<Json>> {
        let id = self.require_id()?;
        if self.status() != Some(MemberStatus::OptOut) {
            return Ok(Vec::new());
        }
        match api.get(&format!("{PATH}/{id}/optout"), &Params::new())? {
            Json::Array(items) => Ok(items),
            Json::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    /// Whether the member has opted out.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` when the status is unknown.
    pub fn has_opted_out(&self) -> Result<bool> {
        if !self.fields.contains("member_status_id") {
            return Err(Error::MissingField {
                resource: Self::NAME,
                field: "member_status_id",
            });
        }
        Ok(self.status() == Some(MemberStatus::OptOut))
    }

    /// Groups this member belongs to.
    pub fn groups<'a>(&'a mut self, api: &'a dyn Transport) -> MemberGroups<'a> {
        MemberGroups {
            api,
            member_id: self.id(),
            cache: &mut self.groups,
        }
    }

    /// Mailings this member has received.
    pub fn mailings<'a>(&'a mut self, api: &'a dyn Transport) -> MemberMailings<'a> {
        Related::new::<Self>(api, PATH, self.id(), "mailings", &mut self.mailings)
    }

    /// Adds the member to `group_ids`.
    ///
    /// # Errors
    ///
    /// See [`MemberGroups::save`].
    pub fn add_groups(&mut self, api: &dyn Transport, group_ids: &[i64]) -> Result<()> {
        let groups: Vec<Group> = group_ids
            .iter()
            .map(|id| Group::from_fields(Fields::new().with(Group::ID_FIELD, *id)))
            .collect();
        self.groups(api).save(&groups)
    }

    /// Drops the member from `group_ids`, or from every group when empty.
    ///
    /// # Errors
    ///
    /// See [`MemberGroups::delete`].
    pub fn drop_groups(&mut self, api: &dyn Transport, group_ids: &[i64]) -> Result<()> {
        self.groups(api).delete(group_ids)
    }

    pub(crate) fn groups_cache_mut(&mut self) -> &mut LazyCollection<Group> {
        &mut self.groups
    }
}

fn missing_member_id() -> Error {
    Error::MissingId {
        resource: Member::NAME,
        field: Member::ID_FIELD,
    }
}

/// Groups of one member.
pub struct MemberGroups<'a> {
    api: &'a dyn Transport,
    member_id: Option<i64>,
    cache: &'a mut LazyCollection<Group>,
}

impl MemberGroups<'_> {
    /// The cache behind this handle.
    #[must_use]
    pub fn cached(&self) -> &LazyCollection<Group> {
        &*self.cache
    }

    /// Loads the member's groups once.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` for an unsaved member, or the request error.
    pub fn fetch_all(&mut self) -> Result<&LazyCollection<Group>> {
        let id = self.member_id.ok_or_else(missing_member_id)?;
        self.cache
            .fetch_all(self.api, &format!("{PATH}/{id}/groups"), &Params::new())?;
        Ok(&*self.cache)
    }

    /// Adds the member to `groups`; the cache is dropped so the next fetch
    /// sees the new memberships.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` for an unsaved member or a group without an
    /// id, or `Error::Rejected` if the service refuses.
    pub fn save(&mut self, groups: &[Group]) -> Result<()> {
        let id = self.member_id.ok_or_else(missing_member_id)?;
        if groups.is_empty() {
            return Ok(());
        }
        let group_ids = groups
            .iter()
            .map(Resource::require_id)
            .collect::<Result<Vec<i64>>>()?;
        let path = format!("{PATH}/{id}/groups");
        let body = lifecycle::params([("group_ids", json!(group_ids))]);
        if !is_truthy(&self.api.put(&path, &body)?) {
            warn!("Adding member {id} to groups rejected");
            return Err(Error::Rejected(Operation::MemberGroupsSave));
        }
        self.cache.clear();
        Ok(())
    }

    /// Drops the member from `group_ids`, or from every group when empty.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` for an unsaved member, or
    /// `Error::Rejected` if the service refuses.
    pub fn delete(&mut self, group_ids: &[i64]) -> Result<()> {
        let id = self.member_id.ok_or_else(missing_member_id)?;
        if group_ids.is_empty() {
            let path = format!("{PATH}/{id}/groups");
            if !is_truthy(&self.api.delete(&path, &Params::new())?) {
                warn!("Dropping member {id} from all groups rejected");
                return Err(Error::Rejected(Operation::MemberGroupsDelete));
            }
            self.cache.clear();
            return Ok(());
        }

        let path = format!("{PATH}/{id}/groups/remove");
        let body = lifecycle::params([("group_ids", json!(group_ids))]);
        if !is_truthy(&self.api.put(&path, &body)?) {
            warn!("Dropping member {id} from groups rejected");
            return Err(Error::Rejected(Operation::MemberGroupsDelete));
        }
        self.cache.retain(|key, _| !group_ids.contains(key));
        Ok(())
    }
}

/// Mailings sent to one member.
pub type MemberMailings<'a> = Related<'a, Mailing>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emma_transport::{Call, Method, MockTransport};

    fn member(id: i64) -> Member {
        Member::from_fields(
            Fields::new()
                .with("member_id", id)
                .with("email", "test@example.com")
                .with("member_status_id", MemberStatus::Active),
        )
    }

    fn shortcuts() -> Vec<String> {
        vec!["first_name".to_string()]
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn flattens_custom_fields() {
            let m = Member::from_json(&json!({
                "member_id": 200,
                "email": "test@example.com",
                "member_status_id": "a",
                "member_since": "@D:2011-01-02T03:04:05",
                "fields": {"first_name": "Emma"},
            }))
            .unwrap();
            assert_eq!(m.id(), Some(200));
            assert_eq!(m.status(), Some(MemberStatus::Active));
            assert_eq!(m.fields().get_str("first_name"), Some("Emma"));
            assert!(m.fields().get_date("member_since").is_some());
        }

        #[test]
        fn extract_nests_shortcut_fields_only() {
            let mut m = member(200);
            m.set("first_name", "Emma");
            m.set("unrelated", "x");
            let data = m.extract(&shortcuts()).unwrap();
            assert_eq!(
                Json::Object(data),
                json!({
                    "member_id": 200,
                    "email": "test@example.com",
                    "fields": {"first_name": "Emma"},
                })
            );
        }

        #[test]
        fn extract_requires_email() {
            let m = Member::from_fields(Fields::new().with("member_id", 200_i64));
            let err = m.extract(&[]).unwrap_err();
            assert!(matches!(err, Error::MissingField { field: "email", .. }));
        }
    }

    mod save_tests {
        use super::*;

        #[test]
        fn add_fills_id_and_status() {
            let mock = MockTransport::new();
            mock.expect(json!({"status": "a", "added": true, "member_id": 1024}));
            let mut m = Member::from_fields(Fields::new().with("email", "new@example.com"));

            m.save(&mock, &[], Some(1), &[300]).unwrap();

            assert_eq!(m.id(), Some(1024));
            assert_eq!(m.status(), Some(MemberStatus::Active));
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Post,
                    "/members/add",
                    json!({"email": "new@example.com", "group_ids": [300], "signup_form_id": 1})
                ))
            );
        }

        #[test]
        fn update_sends_status_to() {
            let mock = MockTransport::new();
            mock.expect(json!(true));
            let mut m = member(200);
            m.set_status(MemberStatus::OptOut);
            m.save(&mock, &[], None, &[]).unwrap();
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Put,
                    "/members/200",
                    json!({"member_id": 200, "email": "test@example.com", "status_to": "o"})
                ))
            );
        }

        #[test]
        fn forwarded_status_is_not_sent() {
            let mock = MockTransport::new();
            mock.expect(json!(true));
            let mut m = member(200);
            m.set_status(MemberStatus::Forwarded);
            m.save(&mock, &[], None, &[]).unwrap();
            assert!(!mock.last_call().unwrap().params.contains_key("status_to"));
        }

        #[test]
        fn update_rejected() {
            let mock = MockTransport::new();
            mock.expect(json!(false));
            let err = member(200).save(&mock, &[], None, &[]).unwrap_err();
            assert!(err.is_rejected(Operation::MemberUpdate));
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn delete_stamps_sentinel() {
            let mock = MockTransport::new();
            mock.expect(json!(true));
            let mut m = member(200);
            m.delete(&mock).unwrap();
            assert!(m.is_deleted());
            m.delete(&mock).unwrap();
            assert_eq!(mock.called(), 1);
        }

        #[test]
        fn delete_without_id() {
            let mock = MockTransport::new();
            let mut m = Member::from_fields(Fields::new().with("email", "x@example.com"));
            assert!(matches!(m.delete(&mock), Err(Error::MissingId { .. })));
        }

        #[test]
        fn opt_out() {
            let mock = MockTransport::new();
            mock.expect(json!(true));
            let mut m = member(200);
            assert!(!m.has_opted_out().unwrap());
            m.opt_out(&mock).unwrap();
            assert!(m.has_opted_out().unwrap());
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Put,
                    "/members/email/optout/test%40example.com",
                    json!({})
                ))
            );
        }

        #[test]
        fn unknown_status_cannot_answer_opt_out() {
            let m = Member::from_fields(Fields::new().with("member_id", 200_i64));
            assert!(m.has_opted_out().is_err());
        }

        #[test]
        fn opt_out_detail_skips_request_for_active_member() {
            let mock = MockTransport::new();
            assert!(member(200).get_opt_out_detail(&mock).unwrap().is_empty());
            assert_eq!(mock.called(), 0);
        }

        #[test]
        fn opt_out_detail_for_opted_out_member() {
            let mock = MockTransport::new();
            mock.expect(json!([{"mailing_id": 123}]));
            let mut m = member(200);
            m.set_status(MemberStatus::OptOut);
            assert_eq!(m.get_opt_out_detail(&mock).unwrap().len(), 1);
            assert_eq!(mock.last_call().unwrap().path, "/members/200/optout");
        }
    }

    mod groups_tests {
        use super::*;

        #[test]
        fn fetch_requires_member_id() {
            let mock = MockTransport::new();
            let mut m = Member::from_fields(Fields::new());
            assert!(m.groups(&mock).fetch_all().is_err());
            assert!(m.mailings(&mock).fetch_all().is_err());
            assert_eq!(mock.called(), 0);
        }

        #[test]
        fn add_groups_clears_cache() {
            let mock = MockTransport::new();
            mock.expect(json!([{"member_group_id": 1024}]));
            mock.expect(json!(true));
            let mut m = member(200);
            m.groups(&mock).fetch_all().unwrap();

            m.add_groups(&mock, &[1025, 1026]).unwrap();

            assert!(m.groups(&mock).cached().is_empty());
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Put,
                    "/members/200/groups",
                    json!({"group_ids": [1025, 1026]})
                ))
            );
        }

        #[test]
        fn drop_some_groups() {
            let mock = MockTransport::new();
            mock.expect(json!([{"member_group_id": 1024}, {"member_group_id": 1025}]));
            mock.expect(json!(true));
            let mut m = member(200);
            m.groups(&mock).fetch_all().unwrap();

            m.drop_groups(&mock, &[1024]).unwrap();

            let left: Vec<i64> = m.groups(&mock).cached().keys().copied().collect();
            assert_eq!(left, vec![1025]);
            assert_eq!(mock.last_call().unwrap().path, "/members/200/groups/remove");
        }

        #[test]
        fn drop_all_groups() {
            let mock = MockTransport::new();
            mock.expect(json!(true));
            let mut m = member(200);
            m.drop_groups(&mock, &[]).unwrap();
            assert_eq!(
                mock.last_call(),
                Some(Call::new(Method::Delete, "/members/200/groups", json!({})))
            );
        }

        #[test]
        fn mailings_are_keyed_by_mailing_id() {
            let mock = MockTransport::new();
            mock.expect(json!([{"mailing_id": 123}, {"mailing_id": 124}]));
            let mut m = member(200);
            let count = m.mailings(&mock).fetch_all().unwrap().len();
            assert_eq!(count, 2);
            assert_eq!(mock.last_call().unwrap().path, "/members/200/mailings");
        }
    }
}
