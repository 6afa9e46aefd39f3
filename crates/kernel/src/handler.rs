use std::{future::Future, sync::Arc};

use futures_util::{future::BoxFuture, FutureExt};
use tower_layer::Layer;

use crate::{IgRequest, IgResponse, Next};

/// One step of a pipeline.
///
/// A handler either answers the request by itself, or passes it (maybe modified) to `next`
/// and returns what comes back (maybe modified).
///
/// ```
/// # use ipgate_kernel::{Handler, IgRequest, IgResponse, Next};
/// # use hyper::header::HeaderValue;
/// struct Server;
/// impl Handler for Server {
///     async fn handle(&self, req: IgRequest, next: Next) -> IgResponse {
///         let mut resp = next.run(req).await;
///         resp.headers_mut().insert("server", HeaderValue::from_static("ipgate"));
///         resp
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: IgRequest, next: Next) -> impl Future<Output = IgResponse> + Send;
}

/// A closure as a [`Handler`], see [`handler_fn`].
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(IgRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = IgResponse> + Send + 'static,
{
    FnHandler { f }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(IgRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = IgResponse> + Send + 'static,
{
    fn handle(&self, req: IgRequest, next: Next) -> impl Future<Output = IgResponse> + Send {
        (self.f)(req, next)
    }
}

type HandleFn = dyn Fn(IgRequest, Next) -> BoxFuture<'static, IgResponse> + Send + Sync + 'static;

/// A type erased [`Handler`], so handlers of different types can share a list.
#[derive(Clone)]
pub struct BoxHandler {
    handle: Arc<HandleFn>,
}

impl std::fmt::Debug for BoxHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxHandler").finish_non_exhaustive()
    }
}

impl BoxHandler {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self::from_shared(Arc::new(handler))
    }

    pub fn from_shared<H: Handler>(handler: Arc<H>) -> Self {
        Self {
            handle: Arc::new(move |req: IgRequest, next: Next| {
                let handler = handler.clone();
                async move { handler.handle(req, next).await }.boxed()
            }),
        }
    }

    /// Put this handler in front of `next`.
    pub fn bind(&self, next: Next) -> Next {
        let handle = self.handle.clone();
        Next::new(move |req| handle(req, next.clone()))
    }
}

impl Handler for BoxHandler {
    fn handle(&self, req: IgRequest, next: Next) -> impl Future<Output = IgResponse> + Send {
        (self.handle)(req, next)
    }
}

/// A [`Handler`] shared as a tower [`Layer`] over [`Next`].
#[derive(Debug)]
pub struct HandlerLayer<H> {
    handler: Arc<H>,
}

impl<H> Clone for HandlerLayer<H> {
    fn clone(&self) -> Self {
        Self { handler: self.handler.clone() }
    }
}

impl<H: Handler> HandlerLayer<H> {
    pub fn new(handler: H) -> Self {
        Self { handler: Arc::new(handler) }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H: Handler> Layer<Next> for HandlerLayer<H> {
    type Service = Next;

    fn layer(&self, inner: Next) -> Next {
        BoxHandler::from_shared(self.handler.clone()).bind(inner)
    }
}

/// Chain `handlers` in front of `backend`, the first handler sees requests first.
pub fn compose<'a, I>(handlers: I, backend: Next) -> Next
where
    I: IntoIterator<Item = &'a BoxHandler>,
    I::IntoIter: DoubleEndedIterator,
{
    handlers.into_iter().rev().fold(backend, |next, handler| handler.bind(next))
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use hyper::{header::HeaderValue, Request, StatusCode};

    use super::*;
    use crate::{text_response, BoxError, IgBody};

    struct Counter {
        hits: AtomicUsize,
    }

    impl Handler for Counter {
        async fn handle(&self, req: IgRequest, next: Next) -> IgResponse {
            self.hits.fetch_add(1, Ordering::SeqCst);
            next.run(req).await
        }
    }

    fn tag(value: &'static str) -> BoxHandler {
        BoxHandler::new(handler_fn(move |req: IgRequest, next: Next| async move {
            let mut resp = next.run(req).await;
            let tags = match resp.headers().get("tags").and_then(|v| v.to_str().ok()) {
                Some(tags) => format!("{value},{tags}"),
                None => value.to_string(),
            };
            if let Ok(tags) = HeaderValue::from_str(&tags) {
                resp.headers_mut().insert("tags", tags);
            }
            resp
        }))
    }

    #[tokio::test]
    async fn test_compose_order() -> Result<(), BoxError> {
        let counter = Arc::new(Counter { hits: AtomicUsize::new(0) });
        let handlers = [tag("a"), BoxHandler::from_shared(counter.clone()), tag("b")];
        let service = compose(&handlers, Next::echo());
        for _ in 0..3 {
            let resp = service.run(Request::new(IgBody::full("body"))).await;
            assert_eq!(resp.headers().get("tags"), Some(&HeaderValue::from_static("a,b")));
            assert_eq!(resp.into_body().into_bytes().await?, "body");
        }
        assert_eq!(counter.hits.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let reached = Arc::new(AtomicUsize::new(0));
        let backend_hits = reached.clone();
        let backend = Next::new(move |req: IgRequest| {
            backend_hits.fetch_add(1, Ordering::SeqCst);
            async move { IgResponse::new(req.into_body()) }
        });
        let deny = BoxHandler::new(handler_fn(|_req, _next| async { text_response(StatusCode::FORBIDDEN, "no") }));
        let resp = compose([&deny], backend).run(Request::new(IgBody::empty())).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_layer() {
        let layer = HandlerLayer::new(Counter { hits: AtomicUsize::new(0) });
        let service = layer.layer(Next::echo());
        let resp = service.run(Request::new(IgBody::empty())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(layer.handler().hits.load(Ordering::SeqCst), 1);
    }
}
