//! The per-route interception layer: accounting before the handler,
//! header decoration after it.

use crate::key::RequestInfo;
use crate::response::ErrorResponse;
use crate::settings::EffectiveSettings;
use crate::window::{self, Outcome};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

pub const LIMIT_HEADER: &str = "x-rate-limit-limit";
pub const REMAINING_HEADER: &str = "x-rate-limit-remaining";
pub const RESET_HEADER: &str = "x-rate-limit-reset";

/// Route layer enforcing one resolved set of rate limit settings.
///
/// Attach with `Router::route_layer` (or `MethodRouter::route_layer`) so
/// only the routes that opted in pay for accounting.
#[derive(Clone)]
pub struct RateLimitLayer {
    settings: Arc<EffectiveSettings>,
}

impl RateLimitLayer {
    pub fn new(settings: EffectiveSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &EffectiveSettings {
        &self.settings
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            settings: self.settings.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    settings: Arc<EffectiveSettings>,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), S::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let settings = self.settings.clone();
        // Take the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if !settings.enabled {
                return inner.call(request).await;
            }

            let info = RequestInfo::from_request(&request);
            let key = (settings.key_fn)(&info);

            let outcome = match window::check(
                settings.store.as_ref(),
                &key,
                settings.limit,
                settings.ttl,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(key = %key, error = %err, "counter store failure");
                    return Ok(ErrorResponse::internal().into_response());
                }
            };

            if outcome.rejected {
                tracing::warn!(key = %key, limit = outcome.limit, "rate limit exceeded");
                let mut response = ErrorResponse::rate_limited().into_response();
                apply_headers(response.headers_mut(), &outcome);
                return Ok(response);
            }

            request.extensions_mut().insert(outcome.clone());
            let mut response = inner.call(request).await?;
            apply_headers(response.headers_mut(), &outcome);
            Ok(response)
        })
    }
}

fn apply_headers(headers: &mut HeaderMap, outcome: &Outcome) {
    if let Ok(value) = HeaderValue::from_str(&outcome.limit.to_string()) {
        headers.insert(LIMIT_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&outcome.remaining_header().to_string()) {
        headers.insert(REMAINING_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&outcome.reset_ms.to_string()) {
        headers.insert(RESET_HEADER, value);
    }
}
