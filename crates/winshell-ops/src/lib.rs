//! Windows Shell file-operation engine bindings.
//!
//! This crate drives the shell's native file-operation engine: copy, move,
//! rename, and delete with Explorer-style UI, undo support, and per-item
//! progress callbacks. The operation logic itself lives inside the shell;
//! this layer owns the leak-free translation around it: engine lifetime,
//! the progress-callback sink, bind data for not-yet-existing destinations,
//! and result-code classification.
//!
//! ```no_run
//! use winshell_ops::{FileOperator, OperationFlags};
//!
//! # fn main() -> winshell_ops::Result<()> {
//! let mut op = FileOperator::new().with_flags(OperationFlags::UNDO);
//! op.open()?;
//! op.copy_file(r"C:\data\report.txt", r"C:\backup", None)?;
//! let summary = op.commit()?;
//! op.close()?;
//! println!("copied {} items", summary.outcomes.len());
//! # Ok(())
//! # }
//! ```

#![cfg(windows)]

mod apartment;
mod bind;
mod item;
mod operator;
mod sink;

pub use item::resolve_item;
pub use operator::{FileOperator, SessionState};
pub use sink::ProgressHandler;

pub use winshell_core::{
    CommitSummary, FileAttributes, ItemOutcome, OpError, OperationFlags, OutcomeMap, Result,
    ResultCode, TransferFlags,
};

// Callers occasionally need the raw item type, e.g. to hold a resolved
// destination across several schedule calls.
pub use windows::Win32::UI::Shell::IShellItem;
