//! Per-request negotiator and lifetime.

use axum::http::Request;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

use crate::context::{Lifetime, RenderConfig};
use crate::negotiate::Negotiator;
use crate::registry::Registry;

/// Layer that makes a [`Negotiator`] available to extractors.
///
/// Every request gets an `Arc<Negotiator>` and a fresh [`Lifetime`] in its
/// extensions. With a configured timeout the lifetime ends that long after
/// the request arrives; an existing `Lifetime` extension is kept and only
/// tightened.
#[derive(Debug, Clone)]
pub struct RenderLayer {
    negotiator: Arc<Negotiator>,
}

impl Default for RenderLayer {
    fn default() -> Self {
        Self::new(Negotiator::default())
    }
}

impl RenderLayer {
    pub fn new(negotiator: Negotiator) -> Self {
        Self {
            negotiator: Arc::new(negotiator),
        }
    }

    /// Use the global registry with `config`.
    pub fn with_config(config: RenderConfig) -> Self {
        Self::new(Negotiator::new(Registry::global(), config))
    }

    /// Use `registry` with the default config.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self::new(Negotiator::new(registry, RenderConfig::default()))
    }

    pub fn negotiator(&self) -> &Arc<Negotiator> {
        &self.negotiator
    }
}

impl<S> Layer<S> for RenderLayer {
    type Service = RenderService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RenderService {
            inner,
            negotiator: self.negotiator.clone(),
        }
    }
}

/// Service installed by [`RenderLayer`].
#[derive(Debug, Clone)]
pub struct RenderService<S> {
    inner: S,
    negotiator: Arc<Negotiator>,
}

impl<S, B> Service<Request<B>> for RenderService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let timeout = self.negotiator.config().get_timeout();
        let lifetime = match (req.extensions_mut().remove::<Lifetime>(), timeout) {
            (Some(existing), Some(timeout)) => {
                existing.deadline(tokio::time::Instant::now() + timeout)
            }
            (Some(existing), None) => existing,
            (None, Some(timeout)) => Lifetime::with_timeout(timeout),
            (None, None) => Lifetime::new(),
        };
        req.extensions_mut().insert(lifetime);
        req.extensions_mut().insert(self.negotiator.clone());
        self.inner.call(req)
    }
}
