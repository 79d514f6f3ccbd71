//! Utility modules: developer trace sink and log4rs configuration.
pub mod devlog;
pub mod logger;
