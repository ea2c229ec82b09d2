//! Middleware module
//!
//! Contains HTTP middleware for caller resolution and request logging.

pub mod auth;
pub mod logging;

pub use auth::{resolve_caller, AuthState, Caller, CallerResolver, HeaderCallerResolver};
pub use logging::{log_request, TraceId, REQUEST_ID_HEADER, TRACE_ID_HEADER};
