//! Hash algorithm implementations.

mod difference;
mod perceptual;

pub use difference::DifferenceHasher;
pub use perceptual::PerceptualHasher;

use crate::core::resize::ResizeError;
use crate::error::HashError;

impl From<ResizeError> for HashError {
    fn from(error: ResizeError) -> Self {
        match error {
            ResizeError::EmptySource => HashError::EmptyImage,
            other => HashError::ComputationFailed(other.to_string()),
        }
    }
}
