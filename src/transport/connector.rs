//! Connection establishment with phase hooks.
//!
//! # Responsibilities
//! - Resolve hostnames, firing `dns_start` / `dns_done`
//! - Open TCP connections through hyper-util's `HttpConnector`
//! - Perform the rustls handshake for `https`, firing `tls_handshake_start` / `_done`
//!
//! # Design Decisions
//! - The trace context is read when a phase begins and reused for its `done` event
//! - `done` hooks fire on failure too, so a failed phase still leaves a sample
//! - Without an installed context both wrappers behave like the plain connector

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::uri::Scheme;
use http::Uri;
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_util::client::legacy::connect::dns::{GaiResolver, Name};
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tower::Service;

use crate::error::BoxError;
use crate::trace::{self, PhaseEvent};

/// Resolver wrapper that reports DNS phases to the current trace context.
#[derive(Clone, Debug)]
pub struct TracingResolver<R = GaiResolver> {
    inner: R,
}

impl TracingResolver {
    pub fn new() -> Self {
        Self::wrap(GaiResolver::new())
    }
}

impl Default for TracingResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> TracingResolver<R> {
    pub fn wrap(inner: R) -> Self {
        Self { inner }
    }
}

impl<R> Service<Name> for TracingResolver<R>
where
    R: Service<Name>,
    R::Response: Send + 'static,
    R::Error: Send + 'static,
    R::Future: Send + 'static,
{
    type Response = R::Response;
    type Error = R::Error;
    type Future = BoxFuture<'static, Result<R::Response, R::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, name: Name) -> Self::Future {
        let ctx = trace::current();
        if let Some(ctx) = &ctx {
            ctx.fire(PhaseEvent::DnsStart);
        }
        let resolving = self.inner.call(name);

        Box::pin(async move {
            let result = resolving.await;
            if let Some(ctx) = ctx {
                ctx.fire(PhaseEvent::DnsDone);
            }
            result
        })
    }
}

/// Connector for plain and TLS connections that reports DNS and TLS phases.
#[derive(Clone)]
pub struct TracedConnector {
    http: HttpConnector<TracingResolver>,
    tls: TlsConnector,
}

impl TracedConnector {
    /// `http` must not enforce the `http` scheme; see [`HttpConnector::enforce_http`].
    pub fn new(http: HttpConnector<TracingResolver>, tls: TlsConnector) -> Self {
        Self { http, tls }
    }
}

impl std::fmt::Debug for TracedConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedConnector")
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

impl Service<Uri> for TracedConnector {
    type Response = MaybeTlsStream;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<MaybeTlsStream, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.http.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let is_https = dst.scheme() == Some(&Scheme::HTTPS);
        let host = dst
            .host()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string());
        let connecting = self.http.call(dst);
        let tls = self.tls.clone();

        Box::pin(async move {
            let tcp = connecting.await?;
            if !is_https {
                return Ok(MaybeTlsStream::Plain(tcp));
            }

            let host = host.ok_or("https URI without a host")?;
            let server_name = ServerName::try_from(host)?;

            let ctx = trace::current();
            if let Some(ctx) = &ctx {
                ctx.fire(PhaseEvent::TlsHandshakeStart);
            }
            let handshake = tls.connect(server_name, tcp.into_inner()).await;
            if let Some(ctx) = &ctx {
                ctx.fire(PhaseEvent::TlsHandshakeDone);
            }

            match handshake {
                Ok(stream) => Ok(MaybeTlsStream::Tls(TokioIo::new(stream))),
                Err(e) => {
                    tracing::trace!(error = %e, "TLS handshake failed");
                    Err(e.into())
                }
            }
        })
    }
}

/// A connection produced by [`TracedConnector`].
pub enum MaybeTlsStream {
    Plain(TokioIo<TcpStream>),
    Tls(TokioIo<TlsStream<TcpStream>>),
}

impl MaybeTlsStream {
    pub fn is_tls(&self) -> bool {
        matches!(self, MaybeTlsStream::Tls(_))
    }
}

impl Connection for MaybeTlsStream {
    fn connected(&self) -> Connected {
        match self {
            MaybeTlsStream::Plain(s) => s.inner().connected(),
            MaybeTlsStream::Tls(s) => {
                let (tcp, _) = s.inner().get_ref();
                tcp.connected()
            }
        }
    }
}

impl Read for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl Write for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            MaybeTlsStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_flush(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            MaybeTlsStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }

    fn is_write_vectored(&self) -> bool {
        match self {
            MaybeTlsStream::Plain(s) => s.is_write_vectored(),
            MaybeTlsStream::Tls(s) => s.is_write_vectored(),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write_vectored(cx, bufs),
            MaybeTlsStream::Tls(s) => Pin::new(s).poll_write_vectored(cx, bufs),
        }
    }
}
