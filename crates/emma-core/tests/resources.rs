//! Entity lifecycles and child collections reached through an [`Account`].

#![allow(clippy::unwrap_used)]

use emma_core::{
    Account, DeliveryType, MailingStatusUpdate, MemberStatus, MessagePart, Operation,
    Recipients, Report, ReportFilter, Resource,
};
use emma_transport::{Call, Method, MockTransport};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emma_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn account() -> (MockTransport, Account) {
    init_tracing();
    let mock = MockTransport::new();
    let account = Account::with_transport(mock.clone());
    (mock, account)
}

mod member_tests {
    use super::*;

    #[test]
    fn update_sends_custom_fields() {
        let (mock, mut account) = account();
        mock.expect(json!([{"field_id": 200, "shortcut_name": "first_name"}]));
        mock.expect(json!({
            "member_id": 1024,
            "email": "test@example.com",
            "member_status_id": "a",
            "fields": {"first_name": "Emma", "ignored": "x"}
        }));
        mock.expect(json!(true));

        let mut members = account.members();
        let shortcuts = members.shortcuts().unwrap();
        let api = members.api();
        let member = members.get(1024).unwrap();
        member.save(api, &shortcuts, None, &[]).unwrap();

        assert_eq!(
            mock.last_call(),
            Some(Call::new(
                Method::Put,
                "/members/1024",
                json!({
                    "member_id": 1024,
                    "email": "test@example.com",
                    "fields": {"first_name": "Emma"},
                    "status_to": "a"
                })
            ))
        );
    }

    #[test]
    fn groups_child_loads_once() {
        let (mock, mut account) = account();
        mock.expect(json!({"member_id": 1024, "email": "test@example.com"}));
        mock.expect(json!([
            {"member_group_id": 150, "group_name": "Test Group 1"},
            {"member_group_id": 151, "group_name": "Test Group 2"},
        ]));

        let mut members = account.members();
        let api = members.api();
        let member = members.get(1024).unwrap();
        assert_eq!(member.groups(api).fetch_all().unwrap().len(), 2);
        assert_eq!(member.groups(api).fetch_all().unwrap().len(), 2);

        assert_eq!(mock.called(), 2);
        assert_eq!(mock.last_call().unwrap().path, "/members/1024/groups");
    }

    #[test]
    fn opt_out_updates_status() {
        let (mock, mut account) = account();
        mock.expect(json!({"member_id": 1024, "email": "test@example.com", "member_status_id": "a"}));
        mock.expect(json!(true));

        let mut members = account.members();
        let api = members.api();
        let member = members.get(1024).unwrap();
        assert!(!member.has_opted_out().unwrap());
        member.opt_out(api).unwrap();

        assert_eq!(member.status(), Some(MemberStatus::OptOut));
        assert_eq!(
            mock.last_call().unwrap().path,
            "/members/email/optout/test%40example.com"
        );
    }

    #[test]
    fn rejected_delete_leaves_member_cached() {
        let (mock, mut account) = account();
        mock.expect(json!({"member_id": 1024, "email": "test@example.com"}));
        mock.expect(json!(false));

        let mut members = account.members();
        members.get(1024).unwrap();
        let err = members.remove(1024).unwrap_err();

        assert!(err.is_rejected(Operation::MemberDelete));
        assert!(!members.cached().get_cached(&1024).unwrap().is_deleted());
    }
}

mod mailing_tests {
    use super::*;

    #[test]
    fn message_forward() {
        let (mock, mut account) = account();
        mock.expect(json!({"mailing_id": 200, "name": "Test"}));
        mock.expect(json!({"plaintext": "Hello"}));
        mock.expect(json!({"mailing_id": 1025}));

        let mut mailings = account.mailings();
        let api = mailings.api();
        let mailing = mailings.get(200).unwrap();
        let mut messages = mailing.messages(api);
        let message = messages
            .find_one_by_member_id(1024, Some(MessagePart::Plaintext))
            .unwrap()
            .unwrap();
        let forwarded = message
            .forward(api, &["friend@example.com".to_string()], Some("Look"))
            .unwrap();

        assert_eq!(forwarded, Some(1025));
        let calls = mock.calls();
        assert_eq!(
            calls[1],
            Call::new(
                Method::Get,
                "/mailings/200/messages/1024",
                json!({"type": "plaintext"})
            )
        );
        assert_eq!(
            calls[2],
            Call::new(
                Method::Post,
                "/forwards/200/1024",
                json!({"recipient_emails": ["friend@example.com"], "note": "Look"})
            )
        );
    }

    #[test]
    fn status_update_and_resend() {
        let (mock, mut account) = account();
        mock.expect(json!({"mailing_id": 200}));
        mock.expect(json!("p"));
        mock.expect(json!(1025));

        let mut mailings = account.mailings();
        let api = mailings.api();
        let mailing = mailings.get(200).unwrap();
        mailing.update_status(api, MailingStatusUpdate::Paused).unwrap();
        let recipients = Recipients {
            groups: vec![150],
            ..Recipients::default()
        };
        assert_eq!(mailing.send_additional(api, &recipients).unwrap(), Some(1025));

        assert_eq!(
            mock.last_call(),
            Some(Call::new(
                Method::Post,
                "/mailings/200",
                json!({"recipient_groups": [150]})
            ))
        );
    }

    #[test]
    fn archive_is_remembered() {
        let (mock, mut account) = account();
        mock.expect(json!({"mailing_id": 200}));
        mock.expect(json!(true));

        let mut mailings = account.mailings();
        let api = mailings.api();
        let mailing = mailings.get(200).unwrap();
        mailing.archive(api).unwrap();
        mailing.archive(api).unwrap();

        assert!(mailing.is_archived());
        assert_eq!(mock.called(), 2);
    }

    #[test]
    fn validate_without_content_is_false() {
        let (mock, mut account) = account();
        assert!(!account.mailings().validate(None, None, None).unwrap());
        assert_eq!(mock.called(), 0);
    }
}

mod trigger_tests {
    use super::*;

    #[test]
    fn parent_mailing_and_children() {
        let (mock, mut account) = account();
        mock.expect(json!([{
            "trigger_id": 1024,
            "name": "Test Trigger",
            "parent_mailing": {"mailing_id": 200, "name": "Test Mailing"}
        }]));
        mock.expect(json!([{"mailing_id": 201}, {"mailing_id": 202}]));

        let mut triggers = account.triggers();
        triggers.fetch_all().unwrap();
        let api = triggers.api();
        let trigger = triggers.get(1024).unwrap();
        assert_eq!(
            trigger.parent_mailing().and_then(|m| m.name()),
            Some("Test Mailing")
        );
        assert_eq!(trigger.mailings(api).fetch_all().unwrap().len(), 2);
        assert_eq!(mock.last_call().unwrap().path, "/triggers/1024/mailings");
        assert_eq!(trigger.id(), Some(1024));
    }
}

mod workflow_tests {
    use super::*;

    #[test]
    fn string_keyed_lookup() {
        let (mock, mut account) = account();
        mock.expect(json!({"workflow_id": "wf-1", "name": "Welcome", "status": "active"}));

        let mut workflows = account.workflows();
        assert_eq!(workflows.get("wf-1").unwrap().status(), Some("active"));
        assert!(workflows.cached().contains(&"wf-1".to_string()));
        assert_eq!(mock.called(), 1);
    }
}

mod report_tests {
    use super::*;

    #[test]
    fn account_summary_for_a_range() {
        let (mock, account) = account();
        mock.expect(json!([{"mailing_id": 200, "sent": 10}]));

        let filter = ReportFilter {
            range: Some("2011-04-01~2011-09-01".into()),
            ..ReportFilter::default()
        };
        let report = account.report(Report::ResponseSummary, None, &filter).unwrap();

        assert_eq!(report.as_array().unwrap().len(), 1);
        assert_eq!(
            mock.last_call(),
            Some(Call::new(
                Method::Get,
                "/response",
                json!({"range": "2011-04-01~2011-09-01"})
            ))
        );
    }

    #[test]
    fn bounced_deliveries_of_a_mailing() {
        let (mock, account) = account();
        mock.expect(json!([]));

        let filter = ReportFilter {
            delivery: Some(DeliveryType::HardBounce),
            ..ReportFilter::default()
        };
        account.report(Report::DeliveredList, Some(200), &filter).unwrap();

        assert_eq!(
            mock.last_call(),
            Some(Call::new(
                Method::Get,
                "/response/200/deliveries",
                json!({"del_status": "b"})
            ))
        );
    }

    #[test]
    fn shares_overview_without_mailing_is_an_error() {
        let (mock, account) = account();
        let filter = ReportFilter::default();
        assert!(account.report(Report::SharesOverview, None, &filter).is_err());
        assert_eq!(mock.called(), 0);
    }
}
