//! Routing module
//!
//! Maps an exact `(method, path)` pair to a handler.

mod table;

pub use table::{Route, RouteError, RouteTable};
