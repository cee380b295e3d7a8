//! vetprobe Common Library
//!
//! Record types, fixture naming and suite configuration shared by the
//! vetprobe browser suite.

pub mod config;
pub mod error;
pub mod naming;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserSettings, Credentials, RetryPolicy, RunnerSettings, SuiteConfig, Timeouts,
};
pub use error::{ConfigError, Result};
pub use naming::FixtureStamp;
pub use types::*;
