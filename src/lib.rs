pub mod app;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod highlight;
pub mod model;
pub mod search;
pub mod store;
pub mod view;

pub use app::Workspace;
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{EngineError, EngineResult};
