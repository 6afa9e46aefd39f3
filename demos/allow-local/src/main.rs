use std::net::SocketAddr;

use hyper::{body::Incoming, header::HeaderValue, service::service_fn, service::Service as _, Request};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use ipgate_filter::IpFilter;
use ipgate_kernel::{compose, BoxError, IgBody, Next, PeerAddr, RemoteAddr};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const PORT: u16 = 3100;

/// Accept connections until `cancel_token` is cancelled, every request carries the [`PeerAddr`] of its connection.
async fn serve(addr: SocketAddr, service: Next, cancel_token: CancellationToken) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("[Ig.Demo] echo server listening on {addr}, only loopback clients are allowed");
    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel_token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("[Ig.Demo] accept failed: {e}");
                    continue;
                }
            },
        };
        let service = service.clone();
        tokio::spawn(async move {
            let conn_service = service_fn(move |req: Request<Incoming>| {
                let mut req = req.map(IgBody::new);
                req.extensions_mut().insert(PeerAddr(peer));
                service.call(req)
            });
            let builder = auto::Builder::new(TokioExecutor::new());
            if let Err(e) = builder.serve_connection(TokioIo::new(stream), conn_service).await {
                tracing::debug!("[Ig.Demo] connection from {peer} closed: {e}");
            }
        });
    }
    tracing::info!("[Ig.Demo] shutting down");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    tracing_subscriber::registry().with(fmt::layer()).with(EnvFilter::from_default_env()).init();

    let mut filter = IpFilter::new(["127.0.0.1/8", "::1/64"]);
    filter.use_fn(|req, next| {
        let remote_addr = RemoteAddr::of(&req);
        async move {
            let mut resp = next.run(req).await;
            if let Ok(value) = HeaderValue::from_str(&remote_addr) {
                resp.headers_mut().insert("ip-allowed", value);
            }
            resp
        }
    });
    let mut handlers = vec![];
    filter.register(&mut handlers);
    let service = compose(&handlers, Next::echo());

    let cancel_token = CancellationToken::new();
    let ctrl_c = {
        let cancel_token = cancel_token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel_token.cancel();
            }
        }
    };
    tokio::spawn(ctrl_c);
    serve(SocketAddr::from(([0, 0, 0, 0, 0, 0, 0, 0], PORT)), service, cancel_token).await
}
