use ipgate_kernel::{BoxHandler, IgRequest, IgResponse, Next};

/// Execution phase of a sub-chain handler.
///
/// Phases run in declaration order; handlers of the same phase run in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Phase {
    Head,
    #[default]
    Request,
    Tail,
}

/// Handlers run for allowed requests before they are forwarded to the next stage.
#[derive(Debug, Default, Clone)]
pub struct SubChain {
    handlers: Vec<(Phase, BoxHandler)>,
    final_handler: Option<BoxHandler>,
}

impl SubChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to `phase`, after every handler already registered for it.
    pub fn push(&mut self, phase: Phase, handler: BoxHandler) {
        let at = self.handlers.partition_point(|(p, _)| *p <= phase);
        self.handlers.insert(at, (phase, handler));
    }

    /// Set the handler which runs after every phase, right before the next stage.
    ///
    /// Setting it again replaces the previous one.
    pub fn set_final(&mut self, handler: BoxHandler) {
        self.final_handler = Some(handler);
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.final_handler.is_none()
    }

    pub fn len(&self) -> usize {
        self.handlers.len() + usize::from(self.final_handler.is_some())
    }

    /// Run the chain, then `next`.
    ///
    /// Any handler may answer by itself instead of calling its next stage.
    pub async fn run(&self, req: IgRequest, next: Next) -> IgResponse {
        let ordered = self.handlers.iter().map(|(_, handler)| handler).chain(self.final_handler.iter());
        ipgate_kernel::compose(ordered, next).run(req).await
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use hyper::{Request, StatusCode};
    use ipgate_kernel::{handler_fn, text_response, BoxError, IgBody};

    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> BoxHandler {
        let log = log.clone();
        BoxHandler::new(handler_fn(move |req, next: Next| {
            log.lock().expect("poisoned").push(name);
            next.run(req)
        }))
    }

    #[tokio::test]
    async fn test_phase_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut chain = SubChain::new();
        chain.set_final(recorder(&log, "final"));
        chain.push(Phase::Tail, recorder(&log, "tail"));
        chain.push(Phase::Request, recorder(&log, "request-1"));
        chain.push(Phase::Head, recorder(&log, "head"));
        chain.push(Phase::Request, recorder(&log, "request-2"));
        assert_eq!(chain.len(), 5);

        let resp = chain.run(Request::new(IgBody::full("ping")), Next::echo()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(*log.lock().expect("poisoned"), ["head", "request-1", "request-2", "tail", "final"]);
    }

    #[tokio::test]
    async fn test_empty_chain_forwards() -> Result<(), BoxError> {
        let chain = SubChain::new();
        assert!(chain.is_empty());
        let resp = chain.run(Request::new(IgBody::full("ping")), Next::echo()).await;
        assert_eq!(resp.into_body().into_bytes().await?, "ping");
        Ok(())
    }

    #[tokio::test]
    async fn test_handler_can_answer() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut chain = SubChain::new();
        chain.push(Phase::Request, BoxHandler::new(handler_fn(|_req, _next| async { text_response(StatusCode::UNAUTHORIZED, "") })));
        chain.set_final(recorder(&log, "final"));
        let resp = chain.run(Request::new(IgBody::empty()), Next::echo()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(log.lock().expect("poisoned").is_empty());
    }
}
