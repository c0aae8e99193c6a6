pub mod config;
pub mod library;
pub mod library_contract;
pub mod logging;
pub mod models;
pub mod paths;
pub mod query;
pub mod redact;
pub mod secrets;

pub use config::{
    Config, ConfigError, LibraryConfig, LogLevel, LoggingConfig, MpcConfig, SuggestConfig,
    ValidationError,
};
pub use library::{Library, LibraryError, LibraryResult, MemoryLibrary};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use models::{AttrValue, Item, ItemId};
pub use paths::{AppDirs, DirsError};
pub use query::{Query, QueryError, QueryTerm};

pub const APP_NAME: &str = "playtally";
pub const APP_AUTHOR: &str = "Playtally";
pub const APP_QUALIFIER: &str = "io";
