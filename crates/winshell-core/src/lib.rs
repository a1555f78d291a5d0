//! Core types for the winshell workspace.
//!
//! This crate holds the platform-independent half of the binding: the
//! bit-exact flag tables, engine result codes with sign normalization, the
//! typed error taxonomy, and the outcome types a commit produces. It has no
//! operating-system dependencies and compiles on any target, so the tables
//! and the classification logic stay testable everywhere.

mod code;
mod error;
mod flags;
mod outcome;

pub use code::ResultCode;
pub use error::{OpError, Result};
pub use flags::{FileAttributes, OperationFlags, TransferFlags};
pub use outcome::{CommitSummary, ItemOutcome, OutcomeMap};
