use std::{fmt, sync::Arc};

use futures_util::{future::BoxFuture, Future, FutureExt};
use hyper::StatusCode;
use ipgate_kernel::{handler_fn, text_response, BoxHandler, Handler, HandlerLayer, IgRequest, IgResponse, Next, RemoteAddr};

use crate::{
    chain::{Phase, SubChain},
    error::RangeParseError,
    range::{self, NetworkRange},
};

/// Body of the default deny response.
pub const FORBIDDEN_MESSAGE: &str = "Forbidden: client IP not allowed";

/// The default deny responder, replies `403` with [`FORBIDDEN_MESSAGE`].
pub async fn forbidden(_req: IgRequest) -> IgResponse {
    text_response(StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE)
}

/// A check run before the ip check, if it returns true the request skips the filter.
pub type BypassFn = Arc<dyn Fn(&IgRequest) -> bool + Send + Sync + 'static>;

/// Replies to requests whose address is not allowed.
#[derive(Clone)]
pub struct DenyResponder {
    f: Arc<dyn Fn(IgRequest) -> BoxFuture<'static, IgResponse> + Send + Sync + 'static>,
}

impl DenyResponder {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(IgRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IgResponse> + Send + 'static,
    {
        Self {
            f: Arc::new(move |req: IgRequest| f(req).boxed()),
        }
    }

    /// Always reply with `status` and `message`.
    pub fn with_code_message(status: StatusCode, message: impl Into<String>) -> Self {
        let message = hyper::body::Bytes::from(message.into());
        Self::new(move |_req| {
            let message = message.clone();
            async move { text_response(status, message) }
        })
    }

    pub fn respond(&self, req: IgRequest) -> BoxFuture<'static, IgResponse> {
        (self.f)(req)
    }
}

impl Default for DenyResponder {
    fn default() -> Self {
        Self::new(forbidden)
    }
}

impl fmt::Debug for DenyResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenyResponder").finish_non_exhaustive()
    }
}

/// What the filter does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// A bypass check matched, the request goes straight to the next stage.
    Bypass,
    /// The address is in no allowed range, the deny responder answers.
    Deny,
    /// The address is allowed, the sub-chain runs and then the next stage.
    Allow,
}

/// Ip range based authorization filter for incoming http traffic.
///
/// Configure it first, then turn it into a layer with [`IpFilter::layer`] or [`IpFilter::register`]:
/// once shared, the filter is read only.
///
/// ```
/// # use ipgate_filter::IpFilter;
/// let mut filter = IpFilter::new(["127.0.0.1/8", "::1/64"]);
/// filter.bypass(|req| req.uri().path() == "/health");
/// assert!(filter.is_allowed("127.0.0.1:8080"));
/// assert!(!filter.is_allowed("10.0.0.1:8080"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct IpFilter {
    ranges: Vec<NetworkRange>,
    parse_errors: Vec<RangeParseError>,
    bypass: Vec<BypassFnDebug>,
    responder: DenyResponder,
    chain: SubChain,
}

#[derive(Clone)]
struct BypassFnDebug(BypassFn);

impl fmt::Debug for BypassFnDebug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BypassFn")
    }
}

impl IpFilter {
    /// Create a filter allowing the given cidr ranges.
    ///
    /// Invalid expressions never fail the construction, they are logged, skipped
    /// and kept in [`IpFilter::parse_errors`].
    pub fn new<I, S>(ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (ranges, parse_errors) = range::parse_ranges(ranges);
        Self {
            ranges,
            parse_errors,
            ..Default::default()
        }
    }

    pub fn ranges(&self) -> &[NetworkRange] {
        &self.ranges
    }

    /// Expressions dropped while building the filter.
    pub fn parse_errors(&self) -> &[RangeParseError] {
        &self.parse_errors
    }

    /// Replace the responder used when an address is not allowed.
    pub fn set_responder<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(IgRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IgResponse> + Send + 'static,
    {
        self.responder = DenyResponder::new(f);
        self
    }

    pub fn responder(&self) -> &DenyResponder {
        &self.responder
    }

    pub fn set_deny_responder(&mut self, responder: DenyResponder) -> &mut Self {
        self.responder = responder;
        self
    }

    /// Register a bypass check. If any check matches, the client ip won't be validated.
    pub fn bypass<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&IgRequest) -> bool + Send + Sync + 'static,
    {
        self.bypass.push(BypassFnDebug(Arc::new(f)));
        self
    }

    /// Register several bypass checks, in order.
    pub fn bypass_all(&mut self, fs: impl IntoIterator<Item = BypassFn>) -> &mut Self {
        self.bypass.extend(fs.into_iter().map(BypassFnDebug));
        self
    }

    /// Append a handler to the request phase of the sub-chain.
    ///
    /// The sub-chain only runs for allowed requests.
    pub fn use_handler<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.use_phase(Phase::Request, handler)
    }

    /// Append a closure to the request phase of the sub-chain.
    pub fn use_fn<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(IgRequest, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IgResponse> + Send + 'static,
    {
        self.chain.push(Phase::Request, BoxHandler::new(handler_fn(f)));
        self
    }

    /// Append a handler to a phase of the sub-chain.
    pub fn use_phase<H: Handler>(&mut self, phase: Phase, handler: H) -> &mut Self {
        self.chain.push(phase, BoxHandler::new(handler));
        self
    }

    /// Set the handler which runs last in the sub-chain, right before the request is forwarded.
    pub fn use_final_handler<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.chain.set_final(BoxHandler::new(handler));
        self
    }

    /// Whether the raw remote address falls into an allowed range, bypass checks aside.
    pub fn is_allowed(&self, raw_addr: &str) -> bool {
        range::matches(&self.ranges, raw_addr)
    }

    /// Decide what to do with a request coming from `raw_addr`.
    pub fn decide(&self, raw_addr: &str, req: &IgRequest) -> Outcome {
        if self.bypass.iter().any(|BypassFnDebug(f)| f(req)) {
            Outcome::Bypass
        } else if self.is_allowed(raw_addr) {
            Outcome::Allow
        } else {
            Outcome::Deny
        }
    }

    /// Filter a request by its [`RemoteAddr`], then deny it, forward it or run the sub-chain and forward it.
    pub async fn filter(&self, req: IgRequest, next: Next) -> IgResponse {
        let remote_addr = RemoteAddr::of(&req);
        match self.decide(&remote_addr, &req) {
            Outcome::Bypass => {
                tracing::trace!(%remote_addr, "[Ig.IpFilter] bypassed");
                next.run(req).await
            }
            Outcome::Deny => {
                tracing::debug!(%remote_addr, "[Ig.IpFilter] client ip not allowed");
                self.responder.respond(req).await
            }
            Outcome::Allow => {
                tracing::trace!(%remote_addr, "[Ig.IpFilter] allowed");
                self.chain.run(req, next).await
            }
        }
    }

    /// Turn the filter into a layer, it can't be configured any more.
    pub fn layer(self) -> HandlerLayer<Self> {
        HandlerLayer::new(self)
    }

    /// Put the filter at the head of a handler stack.
    pub fn register(self, handlers: &mut Vec<BoxHandler>) {
        handlers.insert(0, BoxHandler::new(self));
    }
}

impl Handler for IpFilter {
    fn handle(&self, req: IgRequest, next: Next) -> impl Future<Output = IgResponse> + Send {
        self.filter(req, next)
    }
}
