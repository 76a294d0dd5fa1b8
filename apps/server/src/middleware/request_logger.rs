//! Per-request tracing span with a completion line.

use std::future::{Ready, ready};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use futures_util::future::LocalBoxFuture;
use tracing::{Instrument, debug, info, info_span, warn};

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        // Handlers and aggregation logs inherit these fields.
        let span = info_span!(
            target: "api",
            "request",
            method = %req.method(),
            path = %req.path(),
        );
        span.in_scope(|| {
            debug!(
                target: "api",
                query = %req.query_string(),
                remote_addr = %remote_addr,
                "Request started"
            );
        });

        let fut = {
            let _entered = span.enter();
            self.service.call(req)
        };

        Box::pin(
            async move {
                let res = fut.await?;
                let status = res.status();
                let duration_ms = start.elapsed().as_millis() as u64;

                if status.is_success() || status.is_redirection() {
                    info!(target: "api", status = status.as_u16(), duration_ms, "Request completed");
                } else if status.is_client_error() {
                    warn!(target: "api", status = status.as_u16(), duration_ms, "Client error");
                } else {
                    warn!(target: "api", status = status.as_u16(), duration_ms, "Server error");
                }

                Ok(res)
            }
            .instrument(span),
        )
    }
}
