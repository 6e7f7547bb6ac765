pub mod api;
pub mod models;

pub use api::{FinesResponse, HealthResponse, RawRecord};
pub use models::{FineRecord, NotificationAttempt};
