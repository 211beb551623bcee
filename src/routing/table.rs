//! Route table module
//!
//! Exact `(method, path)` registration and lookup. Built once at startup and
//! shared read-only for the lifetime of the process.

use hyper::Method;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::handler::Handler;

/// Errors raised by the route table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// A route for this method and path is already registered
    #[error("duplicate route: {method} {path}")]
    Duplicate { method: Method, path: String },

    /// No route matches the requested method and path
    #[error("no route matches the request")]
    NotFound,
}

/// A single registered route
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Immutable-after-startup collection of routes
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    // path -> method -> index into `routes`
    index: HashMap<String, HashMap<Method, usize>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an exact method and path
    pub fn register<H>(&mut self, method: Method, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: Handler + 'static,
    {
        let methods = self.index.entry(path.to_string()).or_default();
        if methods.contains_key(&method) {
            return Err(RouteError::Duplicate {
                method,
                path: path.to_string(),
            });
        }

        methods.insert(method.clone(), self.routes.len());
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Find the handler for a method and path.
    ///
    /// Both must match exactly; no normalization is applied.
    pub fn lookup(&self, method: &Method, path: &str) -> Result<&dyn Handler, RouteError> {
        self.index
            .get(path)
            .and_then(|methods| methods.get(method))
            .map(|&i| self.routes[i].handler.as_ref())
            .ok_or(RouteError::NotFound)
    }

    /// Methods registered for an exact path, sorted by name
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .index
            .get(path)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    /// Routes in registration order
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
