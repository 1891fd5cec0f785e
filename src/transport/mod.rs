//! Transports and decorator composition.
//!
//! # Responsibilities
//! - Define the type-erased transport that decorators wrap
//! - Fold an ordered list of decorators over a base transport
//! - Provide the default transport that fires DNS/TLS phase hooks
//!
//! # Design Decisions
//! - Any `tower::Service<http::Request<B>>` is a transport; boxing is optional
//! - Decorator order is nesting order: the first decorator is the innermost
//! - The default transport is hyper-util's pooled client over a traced connector

pub mod client;
pub mod connector;
pub mod tls;

pub use client::{default_transport, DefaultClient};
pub use connector::{MaybeTlsStream, TracedConnector, TracingResolver};

use http::{Request, Response};
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceExt};

pub use crate::error::BoxError;

/// Type-erased transport: request in, response or error out.
pub type Transport<ReqBody, ResBody> = BoxCloneSyncService<Request<ReqBody>, Response<ResBody>, BoxError>;

/// A `Transport -> Transport` transform.
pub type Decorator<ReqBody, ResBody> =
    Box<dyn FnOnce(Transport<ReqBody, ResBody>) -> Transport<ReqBody, ResBody> + Send>;

/// Apply `decorators` to `base` in order, each wrapping the result of the previous.
///
/// `build(base, [a, b])` yields `b(a(base))`.
pub fn build<T, I, F>(base: T, decorators: I) -> T
where
    I: IntoIterator<Item = F>,
    F: FnOnce(T) -> T,
{
    decorators
        .into_iter()
        .fold(base, |chain, decorator| decorator(chain))
}

/// Erase the type of a transport, boxing its error.
pub fn boxed<S, ReqBody, ResBody>(service: S) -> Transport<ReqBody, ResBody>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    ReqBody: 'static,
    ResBody: 'static,
{
    BoxCloneSyncService::new(service.map_err(Into::into))
}

/// Turn a tower layer into a boxed decorator.
pub fn decorator<L, ReqBody, ResBody>(layer: L) -> Decorator<ReqBody, ResBody>
where
    L: Layer<Transport<ReqBody, ResBody>> + Send + 'static,
    L::Service: Service<Request<ReqBody>, Response = Response<ResBody>, Error = BoxError>
        + Clone
        + Send
        + Sync
        + 'static,
    <L::Service as Service<Request<ReqBody>>>::Future: Send + 'static,
    ReqBody: 'static,
    ResBody: 'static,
{
    Box::new(move |next: Transport<ReqBody, ResBody>| {
        boxed::<_, ReqBody, ResBody>(layer.layer(next))
    })
}
