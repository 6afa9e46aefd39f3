use std::{
    pin::Pin,
    task::{Context, Poll},
};

use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::{Body, Bytes, Frame, SizeHint};

use crate::BoxError;

/// Request and response body of every pipeline stage.
///
/// Any [`Body`] yielding [`Bytes`] can be wrapped, e.g. hyper's `Incoming`.
#[derive(Debug)]
pub struct IgBody {
    inner: BoxBody<Bytes, BoxError>,
}

impl Default for IgBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl IgBody {
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            inner: BoxBody::new(body.map_err(Into::into)),
        }
    }

    pub fn empty() -> Self {
        Self {
            inner: BoxBody::new(Empty::new().map_err(|never| match never {})),
        }
    }

    pub fn full(data: impl Into<Bytes>) -> Self {
        Self {
            inner: BoxBody::new(Full::new(data.into()).map_err(|never| match never {})),
        }
    }

    /// Read the whole body.
    ///
    /// # Errors
    /// If the underlying body fails.
    pub async fn into_bytes(self) -> Result<Bytes, BoxError> {
        Ok(self.inner.collect().await?.to_bytes())
    }
}

impl Body for IgBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
