//! Core library for the report-tools command line application.
//!
//! The library manages the lifecycle of downloaded report workbooks and
//! consolidates several of them into one. Workbook IO lives under
//! [`reports::tools::io`], the in-memory document representation inside
//! [`reports::tools::model`], name handling in [`reports::tools::naming`],
//! and the consolidation engine under [`reports::tools::consolidate`]. The
//! [`reports::tools::files::FileManager`] ties them to the configured
//! directories.

pub mod reports;

pub use reports::tools::{
    Result, ToolError, config, consolidate, error, files, io, logging, model, naming, validate,
};
