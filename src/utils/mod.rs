//! Shared utilities

pub mod error;

pub use error::{AutofioError, FitError, ParseError, Result, RunError};
