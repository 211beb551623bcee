//! HTTP protocol layer module
//!
//! Provides the JSON wire format shared by every route, decoupled from routing.

pub mod response;

// Re-export commonly used types
pub use response::{
    build_404_response, build_405_response, build_json_response, single, ResultMapping,
};
