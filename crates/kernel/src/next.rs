use std::{convert::Infallible, fmt::Display, future::Future, sync::Arc};

use futures_util::{future::BoxFuture, FutureExt};
use hyper::{service::Service, StatusCode};

use crate::{text_response, IgRequest, IgResponse};

type NextFn = dyn Fn(IgRequest) -> BoxFuture<'static, IgResponse> + Send + Sync + 'static;

/// The rest of a pipeline, as seen by one of its stages.
///
/// It never fails: errors of a wrapped service become `502` responses.
/// Cloning is cheap, every clone runs the same stages.
#[derive(Clone)]
pub struct Next {
    run: Arc<NextFn>,
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

impl Next {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(IgRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IgResponse> + Send + 'static,
    {
        Self {
            run: Arc::new(move |req: IgRequest| f(req).boxed()),
        }
    }

    /// Use a hyper service as the next stage.
    pub fn service<S>(service: S) -> Self
    where
        S: Service<IgRequest, Response = IgResponse> + Send + Sync + 'static,
        S::Future: Send + 'static,
        S::Error: Display,
    {
        Self::new(move |req: IgRequest| {
            let call = service.call(req);
            async move {
                match call.await {
                    Ok(resp) => resp,
                    Err(e) => {
                        tracing::warn!("[Ig.Next] service failed: {e}");
                        text_response(StatusCode::BAD_GATEWAY, e.to_string())
                    }
                }
            }
        })
    }

    /// A stage answering every request with its own body.
    pub fn echo() -> Self {
        Self::new(|req: IgRequest| async move { IgResponse::new(req.into_body()) })
    }

    pub fn run(&self, req: IgRequest) -> BoxFuture<'static, IgResponse> {
        (self.run)(req)
    }
}

impl Service<IgRequest> for Next {
    type Response = IgResponse;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<IgResponse, Infallible>>;

    fn call(&self, req: IgRequest) -> Self::Future {
        self.run(req).map(Ok).boxed()
    }
}

#[cfg(test)]
mod test {
    use hyper::{service::service_fn, Request};

    use super::*;
    use crate::{BoxError, IgBody};

    #[tokio::test]
    async fn test_echo() -> Result<(), BoxError> {
        let resp = Next::echo().run(Request::new(IgBody::full("ping"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.into_body().into_bytes().await?, "ping");
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_service() -> Result<(), BoxError> {
        let next = Next::service(service_fn(|_req: IgRequest| async { Err::<IgResponse, _>("upstream closed") }));
        let resp = next.run(Request::new(IgBody::empty())).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(resp.into_body().into_bytes().await?, "upstream closed");

        // and back as a hyper service
        let resp = next.call(Request::new(IgBody::empty())).await?;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        Ok(())
    }
}
