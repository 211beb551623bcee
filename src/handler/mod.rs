//! Request handler module
//!
//! Responsible for request routing dispatch and the endpoint handlers.

pub mod endpoints;
pub mod router;

use crate::http::ResultMapping;

// Re-export main entry point
pub use router::handle_request;

/// An endpoint handler.
///
/// Handlers take no request data and always produce a fresh result mapping.
pub trait Handler: Send + Sync {
    fn call(&self) -> ResultMapping;
}

impl<F> Handler for F
where
    F: Fn() -> ResultMapping + Send + Sync,
{
    fn call(&self) -> ResultMapping {
        self()
    }
}
