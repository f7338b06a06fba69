//! HTTP API.
//!
//! Exposes booking, lifecycle, dashboard, directory and vitals logic as
//! JSON endpoints nested under `/api/`. Protected routes run behind
//! Rate Limit → Auth → Audit → Handler.
//!
//! `api_router()` returns a composable `Router` that can be mounted on
//! any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server_on, ApiServer, ApiSession};
pub use types::ApiContext;
