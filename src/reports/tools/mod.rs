pub mod config;
pub mod consolidate;
pub mod error;
pub mod files;
pub mod io;
pub mod logging;
pub mod model;
pub mod naming;
pub mod validate;

pub use error::{Result, ToolError};
