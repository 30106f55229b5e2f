//! Blocking HTTP transport backed by `reqwest`.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::adapter::{Method, Transport};
use crate::error::{Error, Result};
use crate::params::{Params, query_pairs};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.e2ma.net";

/// Account credentials used for HTTP basic authentication.
#[derive(Clone)]
pub struct Credentials {
    /// Account identifier; becomes the first path segment of every request.
    pub account_id: String,
    /// Public API key (basic-auth user).
    pub public_key: String,
    /// Private API key (basic-auth password).
    private_key: String,
}

impl Credentials {
    /// Creates credentials for an account.
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    /// Checks that no credential is blank.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first blank value.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(Error::InvalidConfig("account id is required".into()));
        }
        if self.public_key.trim().is_empty() {
            return Err(Error::InvalidConfig("public key is required".into()));
        }
        if self.private_key.is_empty() {
            return Err(Error::InvalidConfig("private key is required".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Transport that talks to the live API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    credentials: Credentials,
    root: String,
    http_client: Client,
}

impl HttpTransport {
    /// Creates a transport rooted at `{base_url}/{account_id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are blank, the base URL does not
    /// parse, or the HTTP client cannot be built.
    pub fn new(credentials: Credentials, base_url: &str, timeout_secs: u64) -> Result<Self> {
        credentials.validate()?;
        let root = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            credentials.account_id
        );
        Url::parse(&root)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            credentials,
            root,
            http_client,
        })
    }

    /// Creates a transport against [`DEFAULT_BASE_URL`] with a 30 second timeout.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::new`].
    pub fn with_defaults(credentials: Credentials) -> Result<Self> {
        Self::new(credentials, DEFAULT_BASE_URL, 30)
    }

    /// Absolute URL for an account-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{path}", self.root))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url_for(path)?;
        let verb = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        Ok(self
            .http_client
            .request(verb, url)
            .basic_auth(
                &self.credentials.public_key,
                Some(&self.credentials.private_key),
            )
            .header("Accept", "application/json"))
    }

    fn execute(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<Value> {
        debug!("{method} {path}");
        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;

        if status == StatusCode::NOT_FOUND && method == Method::Get {
            debug!("{method} {path} not found");
            return Ok(Value::Null);
        }

        if !status.is_success() {
            warn!("{method} {path} failed with {status}");
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                body
            };
            return Err(Error::status_error(status.as_u16(), message));
        }

        decode_body(&body)
    }
}

/// Decodes a response body; an empty body is `Null`.
fn decode_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, params: &Params) -> Result<Value> {
        let builder = self.request(Method::Get, path)?.query(&query_pairs(params));
        self.execute(Method::Get, path, builder)
    }

    fn post(&self, path: &str, body: &Params) -> Result<Value> {
        let builder = self.request(Method::Post, path)?.json(body);
        self.execute(Method::Post, path, builder)
    }

    fn put(&self, path: &str, body: &Params) -> Result<Value> {
        let builder = self.request(Method::Put, path)?.json(body);
        self.execute(Method::Put, path, builder)
    }

    fn delete(&self, path: &str, params: &Params) -> Result<Value> {
        let builder = self
            .request(Method::Delete, path)?
            .query(&query_pairs(params));
        self.execute(Method::Delete, path, builder)
    }
}
