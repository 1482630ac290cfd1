pub mod annotation;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use annotation::TagAnnotation;
pub use config::Config;
pub use error::{Result, ZakkiError};
pub use types::*;
