pub mod config;
pub mod constants;
pub mod error;
pub mod inspect;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod storage;
pub mod types;

pub use config::{Config, IntegrityMode};
pub use error::{BuildError, Result};
pub use pipeline::{BuildOptions, BuildReport, Pipeline};
pub use storage::Store;
