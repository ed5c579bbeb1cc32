//! Conversion of handler return values into the response.
//!
//! A handler returns any [`Responder`]. When the handler already finalized the response itself,
//! the returned value is discarded.

use crate::body::ResponseBody;
use crate::error::BoxError;
use crate::response::HttpResponse;
use bytes::Bytes;
use http::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;

/// A value that knows how to write itself into the response.
pub trait Responder: Send {
    /// # Errors
    ///
    /// Fails when the value cannot be written, or when it represents a failure itself.
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError>;
}

/// `Err` values are raised to the error handler.
impl<T, E> Responder for Result<T, E>
where
    T: Responder,
    E: Into<BoxError> + Send,
{
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        match self {
            Ok(t) => t.respond_to(response),
            Err(e) => Err(e.into()),
        }
    }
}

/// `None` leaves the response untouched.
impl<T: Responder> Responder for Option<T> {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        match self {
            Some(t) => t.respond_to(response),
            None => Ok(()),
        }
    }
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody> + Send,
{
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        let (parts, body) = self.into_parts();
        response.set_status(parts.status);
        response.headers_mut().extend(parts.headers);
        response.send(body);
        Ok(())
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        let (status, responder) = self;
        responder.respond_to(response)?;
        response.set_status(status);
        Ok(())
    }
}

impl Responder for StatusCode {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        response.set_status(self).send(());
        Ok(())
    }
}

impl<T: Responder> Responder for Box<T> {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        (*self).respond_to(response)
    }
}

impl Responder for () {
    fn respond_to(self, _response: &mut HttpResponse) -> Result<(), BoxError> {
        Ok(())
    }
}

impl Responder for &'static str {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        response.text(self);
        Ok(())
    }
}

impl Responder for String {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        response.text(self);
        Ok(())
    }
}

impl Responder for Bytes {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        response.send(self);
        Ok(())
    }
}

impl Responder for Value {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        response.json(&self)?;
        Ok(())
    }
}

/// Serializes the wrapped value as json.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize + Send> Responder for Json<T> {
    fn respond_to(self, response: &mut HttpResponse) -> Result<(), BoxError> {
        response.json(&self.0)?;
        Ok(())
    }
}

impl Responder for Infallible {
    fn respond_to(self, _response: &mut HttpResponse) -> Result<(), BoxError> {
        match self {}
    }
}
