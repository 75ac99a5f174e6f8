pub mod error;
pub mod normalize;

pub use error::ImageError;
pub use normalize::{normalize, NormalizeConfig};
