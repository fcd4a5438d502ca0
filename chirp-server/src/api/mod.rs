pub mod auth;
pub mod error;
pub mod feed;
pub mod follows;
pub mod posts;
pub mod uploads;
pub mod users;

pub use error::{ApiError, ApiResult};
