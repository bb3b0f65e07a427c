pub mod calculations;
pub mod models;
pub mod observer;
pub mod summary;
pub mod validation;

pub use calculations::{Assessment, LiabilityCalculator};
pub use models::*;
