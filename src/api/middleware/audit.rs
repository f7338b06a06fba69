//! Audit logging middleware.
//!
//! Records actor, method, path and response status for every
//! authenticated request. Runs innermost, after auth has injected
//! the `Actor`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ApiContext;
use crate::identity::Actor;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let ctx = req.extensions().get::<ApiContext>().cloned();
    let actor = req
        .extensions()
        .get::<Actor>()
        .map(Actor::audit_label)
        .unwrap_or_else(|| "anonymous".to_string());

    let response = next.run(req).await;

    if let Some(ctx) = ctx {
        let status = response.status().as_u16();
        ctx.core
            .log_access(&actor, &format!("{method} {path}"), &format!("status:{status}"));
    }

    response
}
