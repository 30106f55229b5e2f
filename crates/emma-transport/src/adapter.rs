//! The transport contract consumed by collections and entities.

use serde_json::Value;

use crate::error::Result;
use crate::params::Params;

/// HTTP verb of a transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Wire name of the verb.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performs one request against the remote service.
///
/// Paths are relative to the account root (e.g. `/members/200`). Each call
/// blocks until the single request completes; implementations own timeouts
/// and authentication. A `Null` response means the service returned nothing.
pub trait Transport {
    /// Issues a `GET` with `params` encoded into the query string.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects it.
    fn get(&self, path: &str, params: &Params) -> Result<Value>;

    /// Issues a `POST` with `body` sent as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects it.
    fn post(&self, path: &str, body: &Params) -> Result<Value>;

    /// Issues a `PUT` with `body` sent as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects it.
    fn put(&self, path: &str, body: &Params) -> Result<Value>;

    /// Issues a `DELETE` with `params` encoded into the query string.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service rejects it.
    fn delete(&self, path: &str, params: &Params) -> Result<Value>;

    /// Dispatches on `method`.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying verb.
    fn call(&self, method: Method, path: &str, params: &Params) -> Result<Value> {
        match method {
            Method::Get => self.get(path, params),
            Method::Post => self.post(path, params),
            Method::Put => self.put(path, params),
            Method::Delete => self.delete(path, params),
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, path: &str, params: &Params) -> Result<Value> {
        (**self).get(path, params)
    }

    fn post(&self, path: &str, body: &Params) -> Result<Value> {
        (**self).post(path, body)
    }

    fn put(&self, path: &str, body: &Params) -> Result<Value> {
        (**self).put(path, body)
    }

    fn delete(&self, path: &str, params: &Params) -> Result<Value> {
        (**self).delete(path, params)
    }
}
