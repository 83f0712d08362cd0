//! Reply values produced by handlers.
//!
//! The dispatch layer does not build transport responses. Handlers and
//! middleware produce a [`Reply`] which is handed, untouched, to whatever
//! renders responses.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{DispatchError, DispatchResult};

/// The value a dispatched request resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Value,
}

impl Default for Reply {
    fn default() -> Self {
        Self::empty()
    }
}

impl Reply {
    /// A `200` reply with the given body.
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// A `200` reply with a `null` body.
    pub fn empty() -> Self {
        Self::new(Value::Null)
    }

    /// A plain-text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Value::String(text.into())).with_header("content-type", "text/plain")
    }

    /// A JSON reply.
    pub fn json(body: Value) -> Self {
        Self::new(body).with_header("content-type", "application/json")
    }

    /// Sets the status code (builder pattern).
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets a header (builder pattern). Header names are lower-cased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets a header in place.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Returns the status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns all headers.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Returns a mutable reference to the body.
    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    /// Consumes the reply, returning its body.
    pub fn into_body(self) -> Value {
        self.body
    }
}

/// Serialises the wrapped value as a JSON reply.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

/// Conversion of handler return values into a [`Reply`].
pub trait IntoReply {
    /// Converts `self` into a reply.
    fn into_reply(self) -> DispatchResult<Reply>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> DispatchResult<Reply> {
        Ok(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> DispatchResult<Reply> {
        Ok(Reply::empty())
    }
}

impl IntoReply for String {
    fn into_reply(self) -> DispatchResult<Reply> {
        Ok(Reply::text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> DispatchResult<Reply> {
        Ok(Reply::text(self))
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> DispatchResult<Reply> {
        Ok(Reply::json(self))
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> DispatchResult<Reply> {
        Ok(Reply::json(serde_json::to_value(self.0)?))
    }
}

/// `None` becomes an empty reply.
impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> DispatchResult<Reply> {
        match self {
            Some(inner) => inner.into_reply(),
            None => Ok(Reply::empty()),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<DispatchError>,
{
    fn into_reply(self) -> DispatchResult<Reply> {
        self.map_err(Into::into).and_then(IntoReply::into_reply)
    }
}
