//! The root aggregate: one account and its resource caches.

use emma_transport::{Credentials, HttpTransport, Transport};
use tracing::debug;

use crate::collection::LazyCollection;
use crate::config::Config;
use crate::error::Result;
use crate::field::{AccountFields, Field};
use crate::group::{AccountGroups, Group};
use crate::mailing::{AccountMailings, Mailing};
use crate::member::{AccountMembers, Member};
use crate::member_import::{AccountImports, MemberImport};
use crate::report::{self, Report, ReportFilter};
use crate::search::{AccountSearches, Search};
use crate::trigger::{AccountTriggers, Trigger};
use crate::webhook::{AccountWebHooks, WebHook};
use crate::workflow::{AccountWorkflows, Workflow};

/// An Emma account.
///
/// Owns the transport and one cache per resource type. Each cache is
/// created on first use of its accessor and lives as long as the account.
/// Accessors hand out short-lived handles borrowing both.
///
/// ```ignore
/// let mut account = Account::new("1234", "public", "private")?;
/// for group in account.groups().fetch_all(&[GroupType::RegularGroup])?.values() {
///     println!("{:?}", group.name());
/// }
/// ```
pub struct Account {
    account_id: Option<String>,
    api: Box<dyn Transport>,
    fields: Option<LazyCollection<Field>>,
    groups: Option<LazyCollection<Group>>,
    imports: Option<LazyCollection<MemberImport>>,
    mailings: Option<LazyCollection<Mailing>>,
    members: Option<LazyCollection<Member>>,
    searches: Option<LazyCollection<Search>>,
    triggers: Option<LazyCollection<Trigger>>,
    webhooks: Option<LazyCollection<WebHook>>,
    workflows: Option<LazyCollection<Workflow>>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Connects to the live API with the default root and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential is blank or the HTTP client cannot
    /// be built.
    pub fn new(
        account_id: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Result<Self> {
        let credentials = Credentials::new(account_id, public_key, private_key);
        let account_id = credentials.account_id.clone();
        let transport = HttpTransport::with_defaults(credentials)?;
        Ok(Self::with_transport(transport).with_account_id(account_id))
    }

    /// Connects as described by `config`, reading the private key from the
    /// keyring when the config has none.
    ///
    /// # Errors
    ///
    /// Returns an error if no private key can be found or the transport
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport =
            HttpTransport::new(config.credentials()?, &config.base_url, config.timeout_secs)?;
        debug!("Connected account {} at {}", config.account_id, config.base_url);
        Ok(Self::with_transport(transport).with_account_id(config.account_id.clone()))
    }

    /// Uses `transport` for every request.
    #[must_use]
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            account_id: None,
            api: Box::new(transport),
            fields: None,
            groups: None,
            imports: None,
            mailings: None,
            members: None,
            searches: None,
            triggers: None,
            webhooks: None,
            workflows: None,
        }
    }

    /// Records the account id reported by [`Account::account_id`].
    #[must_use]
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Account id, when known.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// Transport for entity lifecycle calls.
    #[must_use]
    pub fn api(&self) -> &dyn Transport {
        self.api.as_ref()
    }

    /// Member field definitions.
    pub fn fields(&mut self) -> AccountFields<'_> {
        AccountFields::new(
            self.api.as_ref(),
            self.fields.get_or_insert_with(LazyCollection::new),
        )
    }

    /// Groups.
    pub fn groups(&mut self) -> AccountGroups<'_> {
        AccountGroups::new(
            self.api.as_ref(),
            self.groups.get_or_insert_with(LazyCollection::new),
        )
    }

    /// Member imports.
    pub fn imports(&mut self) -> AccountImports<'_> {
        AccountImports::new(
            self.api.as_ref(),
            self.imports.get_or_insert_with(LazyCollection::new),
        )
    }

    /// Mailings.
    pub fn mailings(&mut self) -> AccountMailings<'_> {
        AccountMailings::new(
            self.api.as_ref(),
            self.mailings.get_or_insert_with(LazyCollection::new),
        )
    }

    /// Members. Bulk saves consult the field definitions cache.
    pub fn members(&mut self) -> AccountMembers<'_> {
        AccountMembers::new(
            self.api.as_ref(),
            self.members.get_or_insert_with(LazyCollection::new),
            self.fields.get_or_insert_with(LazyCollection::new),
        )
    }

    /// Fetches a response report; see [`report::get_report`].
    ///
    /// # Errors
    ///
    /// Returns an error if a per-mailing report has no mailing id or the
    /// request fails.
    pub fn report(
        &self,
        kind: Report,
        mailing_id: Option<i64>,
        filter: &ReportFilter,
    ) -> Result<serde_json::Value> {
        report::get_report(self.api.as_ref(), kind, mailing_id, filter)
    }

    /// Saved searches.
    pub fn searches(&mut self) -> AccountSearches<'_> {
        AccountSearches::new(
            self.api.as_ref(),
            self.searches.get_or_insert_with(LazyCollection::new),
        )
    }

    /// Triggers.
    pub fn triggers(&mut self) -> AccountTriggers<'_> {
        AccountTriggers::new(
            self.api.as_ref(),
            self.triggers.get_or_insert_with(LazyCollection::new),
        )
    }

    /// Webhooks.
    pub fn webhooks(&mut self) -> AccountWebHooks<'_> {
        AccountWebHooks::new(
            self.api.as_ref(),
            self.webhooks.get_or_insert_with(LazyCollection::new),
        )
    }

    /// Automation workflows.
    pub fn workflows(&mut self) -> AccountWorkflows<'_> {
        AccountWorkflows::new(
            self.api.as_ref(),
            self.workflows.get_or_insert_with(LazyCollection::new),
        )
    }
}
