//! Mailing response reports.
//!
//! Reports are read-only and never cached. The account-wide summary lives at
//! `/response`; every other report belongs to one mailing and lives under
//! `/response/{mailing_id}`.

use emma_transport::{Params, Transport};
use serde_json::{Value as Json, json};
use tracing::debug;

use crate::enumerations::DeliveryType;
use crate::error::{Error, Result};

const PATH: &str = "/response";

/// Kind of response report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Report {
    /// Response overview of every mailing in the account.
    ResponseSummary,
    /// Response overview of one mailing.
    MailingSummary,
    /// Members the mailing was sent to.
    SentList,
    /// Members still being sent to.
    InProgressList,
    /// Delivery outcomes, optionally filtered by [`DeliveryType`].
    DeliveredList,
    /// Members who opened the mailing.
    OpenList,
    /// Links in the mailing.
    LinkList,
    /// Clicks, optionally for one member or link.
    ClickList,
    /// Forwards.
    ForwardList,
    /// Opt-outs.
    OptOutList,
    /// Signups attributed to the mailing.
    SignUpList,
    /// Social shares.
    SharesList,
    /// Shares made by members.
    CustomerSharesList,
    /// Clicks on member shares.
    CustomerShareClicksList,
    /// One member share.
    CustomerShare,
    /// Share totals per network.
    SharesOverview,
}

impl Report {
    /// Every report kind.
    pub const ALL: [Self; 16] = [
        Self::ResponseSummary,
        Self::MailingSummary,
        Self::SentList,
        Self::InProgressList,
        Self::DeliveredList,
        Self::OpenList,
        Self::LinkList,
        Self::ClickList,
        Self::ForwardList,
        Self::OptOutList,
        Self::SignUpList,
        Self::SharesList,
        Self::CustomerSharesList,
        Self::CustomerShareClicksList,
        Self::CustomerShare,
        Self::SharesOverview,
    ];

    /// Path below `/response/{mailing_id}`, if any.
    const fn suffix(self) -> Option<&'static str> {
        match self {
            Self::ResponseSummary | Self::MailingSummary => None,
            Self::SentList => Some("sends"),
            Self::InProgressList => Some("in_progress"),
            Self::DeliveredList => Some("deliveries"),
            Self::OpenList => Some("opens"),
            Self::LinkList => Some("links"),
            Self::ClickList => Some("clicks"),
            Self::ForwardList => Some("forwards"),
            Self::OptOutList => Some("optouts"),
            Self::SignUpList => Some("signups"),
            Self::SharesList => Some("shares"),
            Self::CustomerSharesList => Some("customer_shares"),
            Self::CustomerShareClicksList => Some("customer_share_clicks"),
            Self::CustomerShare => Some("customer_share"),
            Self::SharesOverview => Some("shares/overview"),
        }
    }

    /// Whether the report belongs to a single mailing.
    #[must_use]
    pub const fn needs_mailing(self) -> bool {
        !matches!(self, Self::ResponseSummary)
    }

    /// Request path for this report.
    ///
    /// The account summary ignores `mailing_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingId` if a per-mailing report has no mailing id.
    pub fn path(self, mailing_id: Option<i64>) -> Result<String> {
        if !self.needs_mailing() {
            return Ok(PATH.to_string());
        }
        let id = mailing_id.ok_or(Error::MissingId {
            resource: "report",
            field: "mailing_id",
        })?;
        Ok(match self.suffix() {
            Some(suffix) => format!("{PATH}/{id}/{suffix}"),
            None => format!("{PATH}/{id}"),
        })
    }
}

/// Query options for [`get_report`].
///
/// Only set options are sent; each applies to the reports noted on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Include archived mailings ([`Report::ResponseSummary`]).
    pub include_archived: bool,
    /// Date range such as `2011-04-01~2011-09-01`
    /// ([`Report::ResponseSummary`]).
    pub range: Option<String>,
    /// Delivery outcome ([`Report::DeliveredList`]).
    pub delivery: Option<DeliveryType>,
    /// Clicks of one member ([`Report::ClickList`]).
    pub member_id: Option<i64>,
    /// Clicks of one link ([`Report::ClickList`]).
    pub link_id: Option<i64>,
}

impl ReportFilter {
    /// Query parameters for the set options.
    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if self.include_archived {
            params.insert("include_archived".into(), Json::Bool(true));
        }
        if let Some(range) = &self.range {
            params.insert("range".into(), json!(range));
        }
        if let Some(delivery) = self.delivery {
            params.insert("del_status".into(), json!(delivery.as_code()));
        }
        if let Some(member_id) = self.member_id {
            params.insert("member_id".into(), json!(member_id));
        }
        if let Some(link_id) = self.link_id {
            params.insert("link_id".into(), json!(link_id));
        }
        params
    }
}

/// Fetches a report as the service returns it.
///
/// List reports answer with an array and summaries with an object. An
/// unknown mailing yields `Null`.
///
/// # Errors
///
/// Returns `Error::MissingId` if a per-mailing report has no mailing id, or
/// the request error.
pub fn get_report(
    api: &dyn Transport,
    report: Report,
    mailing_id: Option<i64>,
    filter: &ReportFilter,
) -> Result<Json> {
    let path = report.path(mailing_id)?;
    debug!("Fetching {report:?} report from {path}");
    Ok(api.get(&path, &filter.to_params())?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emma_transport::{Call, Method, MockTransport};

    mod path_tests {
        use super::*;

        #[test]
        fn account_summary_ignores_mailing() {
            assert_eq!(Report::ResponseSummary.path(None).unwrap(), "/response");
            assert_eq!(Report::ResponseSummary.path(Some(123)).unwrap(), "/response");
        }

        #[test]
        fn per_mailing_paths() {
            let expected = [
                (Report::MailingSummary, "/response/123"),
                (Report::SentList, "/response/123/sends"),
                (Report::InProgressList, "/response/123/in_progress"),
                (Report::DeliveredList, "/response/123/deliveries"),
                (Report::OpenList, "/response/123/opens"),
                (Report::LinkList, "/response/123/links"),
                (Report::ClickList, "/response/123/clicks"),
                (Report::ForwardList, "/response/123/forwards"),
                (Report::OptOutList, "/response/123/optouts"),
                (Report::SignUpList, "/response/123/signups"),
                (Report::SharesList, "/response/123/shares"),
                (Report::CustomerSharesList, "/response/123/customer_shares"),
                (
                    Report::CustomerShareClicksList,
                    "/response/123/customer_share_clicks",
                ),
                (Report::CustomerShare, "/response/123/customer_share"),
                (Report::SharesOverview, "/response/123/shares/overview"),
            ];
            for (report, path) in expected {
                assert_eq!(report.path(Some(123)).unwrap(), path, "{report:?}");
            }
            assert_eq!(expected.len() + 1, Report::ALL.len());
        }

        #[test]
        fn per_mailing_report_needs_id() {
            for report in Report::ALL.into_iter().filter(|r| r.needs_mailing()) {
                let err = report.path(None).unwrap_err();
                assert!(matches!(err, Error::MissingId { field: "mailing_id", .. }));
            }
        }
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn empty_filter_sends_nothing() {
            assert!(ReportFilter::default().to_params().is_empty());
        }

        #[test]
        fn set_options_are_sent() {
            let filter = ReportFilter {
                include_archived: true,
                range: Some("2011-04-01~2011-09-01".into()),
                delivery: Some(DeliveryType::Delivered),
                member_id: Some(1024),
                link_id: Some(1025),
            };
            assert_eq!(
                Json::Object(filter.to_params()),
                json!({
                    "include_archived": true,
                    "range": "2011-04-01~2011-09-01",
                    "del_status": "d",
                    "member_id": 1024,
                    "link_id": 1025
                })
            );
        }
    }

    mod request_tests {
        use super::*;

        #[test]
        fn summary_with_archived() {
            let mock = MockTransport::new();
            mock.expect(json!([]));
            let filter = ReportFilter {
                include_archived: true,
                ..ReportFilter::default()
            };
            let report = get_report(&mock, Report::ResponseSummary, None, &filter).unwrap();
            assert!(report.is_array());
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Get,
                    "/response",
                    json!({"include_archived": true})
                ))
            );
        }

        #[test]
        fn deliveries_by_status() {
            let mock = MockTransport::new();
            mock.expect(json!([]));
            let filter = ReportFilter {
                delivery: Some(DeliveryType::Delivered),
                ..ReportFilter::default()
            };
            get_report(&mock, Report::DeliveredList, Some(123), &filter).unwrap();
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Get,
                    "/response/123/deliveries",
                    json!({"del_status": "d"})
                ))
            );
        }

        #[test]
        fn clicks_for_member() {
            let mock = MockTransport::new();
            mock.expect(json!([]));
            let filter = ReportFilter {
                member_id: Some(1024),
                ..ReportFilter::default()
            };
            get_report(&mock, Report::ClickList, Some(123), &filter).unwrap();
            assert_eq!(
                mock.last_call(),
                Some(Call::new(
                    Method::Get,
                    "/response/123/clicks",
                    json!({"member_id": 1024})
                ))
            );
        }

        #[test]
        fn missing_mailing_sends_nothing() {
            let mock = MockTransport::new();
            assert!(get_report(&mock, Report::OpenList, None, &ReportFilter::default()).is_err());
            assert_eq!(mock.called(), 0);
        }

        #[test]
        fn each_report_is_one_request() {
            let mock = MockTransport::new();
            mock.respond_with(json!({}));
            for report in Report::ALL {
                get_report(&mock, report, Some(123), &ReportFilter::default()).unwrap();
            }
            assert_eq!(mock.called(), Report::ALL.len());
        }
    }
}
