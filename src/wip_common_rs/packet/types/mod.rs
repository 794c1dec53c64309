//! Per-role packet types built on `core::Header` + role-specific fixed body.

pub mod error_response;
pub mod location;
pub mod query;
pub mod report;
pub mod weather;

pub use error_response::ErrorResponse;
pub use location::{LocationRequest, LocationResponse};
pub use query::{QueryRequest, QueryResponse};
pub use report::{ReportRequest, ReportResponse};
pub use weather::{WeatherRequest, WeatherResponse};
