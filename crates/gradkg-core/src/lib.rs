//! gradkg core: curriculum graph model, configuration, errors.

pub mod config;
pub mod error;
pub mod model;

pub use config::{DataPaths, GradKgConfig};
pub use error::{Error, Result};
pub use model::*;
