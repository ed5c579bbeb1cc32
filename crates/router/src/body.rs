//! The buffered body of a dispatched response.
//!
//! Handlers and middleware write the whole body into the [`HttpResponse`](crate::HttpResponse)
//! before it is returned, so the body is a single data frame, or none when empty.

use crate::error::BoxError;
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};

#[derive(Debug, Clone, Default)]
pub struct ResponseBody {
    bytes: Option<Bytes>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { bytes: None }
    }

    /// A body holding `bytes`; empty bytes give an empty body.
    pub fn once(bytes: Bytes) -> Self {
        Self { bytes: (!bytes.is_empty()).then_some(bytes) }
    }

    /// The bytes not yet taken by a frame.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }

    pub fn len(&self) -> usize {
        self.bytes.as_ref().map_or(0, Bytes::len)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_none()
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::once(bytes)
    }
}

impl From<Option<Bytes>> for ResponseBody {
    fn from(bytes: Option<Bytes>) -> Self {
        bytes.map_or_else(Self::empty, Self::once)
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().bytes.take().map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        self.bytes.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn check_send_sync<T: Send + Sync>() {}

    #[test]
    fn is_send_and_sync() {
        check_send_sync::<ResponseBody>();
    }

    #[tokio::test]
    async fn test_text_body_is_one_frame() {
        let mut body = ResponseBody::from("post 1".to_owned());

        assert_eq!(body.size_hint().exact(), Some(6));
        assert!(!body.is_end_stream());

        let bytes = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(bytes, Bytes::from("post 1"));
        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_bytes_give_empty_body() {
        let mut body = ResponseBody::from("");

        assert!(body.is_empty());
        assert_eq!(body.size_hint().exact(), Some(0));
        assert!(body.frame().await.is_none());
        assert!(ResponseBody::from(Vec::new()).is_end_stream());
    }
}
