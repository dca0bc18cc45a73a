//! Poll lifecycle, response collection and result aggregation.

mod lifecycle;
mod responses;
mod results;

pub use lifecycle::*;
pub use responses::*;

use crate::errors::AppError;

fn poll_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Poll {} not found", id))
}
