//! The mutable response a request handler writes into.

use crate::body::ResponseBody;
use crate::error::BoxError;
use http::header::{self, InvalidHeaderValue};
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde::Serialize;

/// Response state carried by the [`HttpContext`](crate::HttpContext).
///
/// Once a body has been sent the response is finalized: the value returned by a handler is then ignored.
#[derive(Debug, Default)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    finalized: bool,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Sets the body and finalizes the response.
    pub fn send(&mut self, body: impl Into<ResponseBody>) -> &mut Self {
        self.body = body.into();
        self.finalized = true;
        self
    }

    /// Sends `text` as `text/plain`.
    pub fn text(&mut self, text: impl Into<ResponseBody>) -> &mut Self {
        self.set_content_type(mime::TEXT_PLAIN_UTF_8.as_ref());
        self.send(text)
    }

    /// Serializes `value` and sends it as `application/json`.
    ///
    /// # Errors
    ///
    /// Fails when `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, BoxError> {
        let bytes = serde_json::to_vec(value)?;
        self.set_content_type(mime::APPLICATION_JSON.as_ref());
        Ok(self.send(bytes))
    }

    /// Redirects to `location` with the given status.
    ///
    /// # Errors
    ///
    /// Fails when `location` is not a valid header value.
    pub fn redirect_to(&mut self, location: &str, status: StatusCode) -> Result<&mut Self, InvalidHeaderValue> {
        let value = HeaderValue::from_str(location)?;
        self.headers.insert(header::LOCATION, value);
        self.status = status;
        Ok(self.send(ResponseBody::empty()))
    }

    /// Drops the status, headers and body written so far.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    pub fn into_http(self) -> Response<ResponseBody> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    fn set_content_type(&mut self, content_type: &'static str) {
        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
}
