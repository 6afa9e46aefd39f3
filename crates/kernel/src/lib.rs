//! # Ipgate kernel
//!
//! The handler contract request filters are written against:
//! - [`Next`], the shared next stage of a pipeline,
//! - [`Handler`], a pipeline step which may answer a request itself or pass it to its [`Next`],
//! - [`IgBody`], the body every stage reads and writes,
//! - [`RemoteAddr`] and [`PeerAddr`], where a request came from.
#![deny(clippy::unwrap_used, clippy::dbg_macro, clippy::unimplemented, clippy::todo, clippy::inline_always)]
pub mod body;
pub mod handler;
pub mod next;
pub mod remote_addr;

pub use body::IgBody;
pub use handler::{compose, handler_fn, BoxHandler, FnHandler, Handler, HandlerLayer};
pub use next::Next;
pub use remote_addr::{PeerAddr, RemoteAddr};
pub use tower_layer::Layer;

use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    Request, Response, StatusCode,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type IgRequest = Request<IgBody>;
pub type IgResponse = Response<IgBody>;

/// A `text/plain` response.
pub fn text_response(status: StatusCode, message: impl Into<hyper::body::Bytes>) -> IgResponse {
    let mut resp = Response::new(IgBody::full(message));
    *resp.status_mut() = status;
    resp.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    resp
}
