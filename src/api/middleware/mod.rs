//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter: reject early, save resources
//! 2. Auth validator: resolves the bearer token to an `Actor`
//! 3. Audit logger: logs after auth, has the actor

pub mod audit;
pub mod auth;
pub mod rate;
