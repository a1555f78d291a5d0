//! Operation scheduler: queue shell file operations, then commit them as
//! one batch.
//!
//! A [`FileOperator`] owns one engine instance per open scope. Operations
//! are scheduled first and performed together by [`FileOperator::commit`],
//! which blocks the calling thread for the whole batch, including any time
//! spent in interactive collision dialogs. One operator must never be shared
//! across threads; every worker thread gets its own.

use std::cell::RefCell;
use std::ffi::{OsStr, c_void};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};
use windows::core::PCWSTR;
use windows::Win32::Foundation::HWND;
use windows::Win32::System::Com::{CLSCTX_ALL, CoCreateInstance};
use windows::Win32::UI::Shell::{
    FILEOPERATION_FLAGS, FileOperation, IFileOperation, IFileOperationProgressSink,
};

use winshell_core::{CommitSummary, FileAttributes, OpError, OperationFlags, Result, ResultCode};

use crate::apartment::ensure_com_initialized;
use crate::item::{self, to_wide};
use crate::sink::{OperationSink, ProgressHandler, SinkState};

/// Lifecycle of a [`FileOperator`] scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No scope has been entered yet.
    #[default]
    Unopened,
    /// A scope is active; operations may be queued and committed.
    Open,
    /// The scope was closed; a fresh scope may be opened.
    Closed,
}

struct Engine {
    op: IFileOperation,
    cookie: u32,
    sink: Rc<RefCell<SinkState>>,
    queued: bool,
    committed: bool,
}

/// A session for performing shell file operations.
///
/// Operations are scheduled with the queue methods, then performed with
/// [`commit`](Self::commit), or automatically on scope exit when configured
/// with [`commit_on_close`](Self::commit_on_close) and driven through
/// [`session`](Self::session). A scope is not reentrant; after
/// [`close`](Self::close) the operator may be reopened for a fresh cycle.
#[derive(Default)]
pub struct FileOperator {
    flags: Option<OperationFlags>,
    parent: Option<isize>,
    commit_on_close: bool,
    handler: Option<Box<dyn ProgressHandler>>,
    state: SessionState,
    engine: Option<Engine>,
    last: Option<CommitSummary>,
}

impl FileOperator {
    /// Create an operator with default behavior: operations run just as if
    /// the user had performed them in the Explorer with no modifiers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation flags applied when a scope opens.
    pub fn with_flags(mut self, flags: OperationFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Set the window that should own any dialog boxes, as a raw handle.
    pub fn with_parent(mut self, hwnd: isize) -> Self {
        self.parent = Some(hwnd);
        self
    }

    /// Install a progress handler forwarded every engine callback.
    pub fn with_handler(mut self, handler: Box<dyn ProgressHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Commit automatically when a [`session`](Self::session) scope exits
    /// without an error.
    pub fn commit_on_close(mut self, enabled: bool) -> Self {
        self.commit_on_close = enabled;
        self
    }

    /// Current scope state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The summary of the most recent commit, if any.
    pub fn last_commit(&self) -> Option<&CommitSummary> {
        self.last.as_ref()
    }

    /// Enter a scope: acquire the engine, register the progress sink, and
    /// apply the configured owner window and flags.
    ///
    /// Fails with [`OpError::Reentrancy`] while a scope is already open.
    pub fn open(&mut self) -> Result<()> {
        if self.state == SessionState::Open {
            return Err(OpError::Reentrancy);
        }
        ensure_com_initialized();

        let op: IFileOperation =
            unsafe { CoCreateInstance(&FileOperation, None, CLSCTX_ALL) }.map_err(item::translate)?;
        let sink_state = Rc::new(RefCell::new(SinkState::new(self.handler.take())));
        let sink: IFileOperationProgressSink =
            OperationSink::new(Rc::clone(&sink_state)).into();
        let cookie = match unsafe { op.Advise(&sink) } {
            Ok(cookie) => cookie,
            Err(err) => {
                self.handler = sink_state.borrow_mut().take_handler();
                return Err(item::translate(err));
            }
        };
        if let Err(err) = self.apply_options(&op) {
            let _ = unsafe { op.Unadvise(cookie) };
            self.handler = sink_state.borrow_mut().take_handler();
            return Err(err);
        }

        self.engine = Some(Engine {
            op,
            cookie,
            sink: sink_state,
            queued: false,
            committed: false,
        });
        self.state = SessionState::Open;
        debug!(target: "winshell", "file operation session opened");
        Ok(())
    }

    fn apply_options(&self, op: &IFileOperation) -> Result<()> {
        if let Some(parent) = self.parent {
            unsafe { op.SetOwnerWindow(HWND(parent as *mut c_void)) }.map_err(item::translate)?;
        }
        if let Some(flags) = self.flags {
            unsafe { op.SetOperationFlags(FILEOPERATION_FLAGS(flags.bits())) }
                .map_err(item::translate)?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Open => Ok(()),
            _ => Err(OpError::NotOpen),
        }
    }

    fn engine_mut(&mut self) -> Result<&mut Engine> {
        self.ensure_open()?;
        self.engine.as_mut().ok_or(OpError::NotOpen)
    }

    /// Schedule a move of `source` into the `destination` directory,
    /// optionally renaming it in the process. The destination directory need
    /// not exist yet. A move to a different logical drive is performed by
    /// the engine as a copy and delete.
    pub fn move_file(
        &mut self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        new_name: Option<&str>,
    ) -> Result<()> {
        let source = source.as_ref();
        self.ensure_open()?;
        let src = item::resolve_item(source, false)?;
        let dst = item::resolve_item(destination.as_ref(), true)?;
        let wide_name = new_name.map(|n| to_wide(OsStr::new(n)));
        let engine = self.engine_mut()?;
        unsafe {
            engine.op.MoveItem(
                &src,
                &dst,
                opt_pcwstr(wide_name.as_ref()),
                None::<&IFileOperationProgressSink>,
            )
        }
        .map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", source = %source.display(), "queued move");
        Ok(())
    }

    /// Schedule a move of several sources into the `destination` directory.
    pub fn move_files<I, P>(&mut self, sources: I, destination: impl AsRef<Path>) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ensure_open()?;
        let items = item::resolve_items(sources)?;
        let dst = item::resolve_item(destination.as_ref(), true)?;
        let engine = self.engine_mut()?;
        unsafe { engine.op.MoveItems(&items, &dst) }.map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", "queued batch move");
        Ok(())
    }

    /// Schedule a copy of `source` into the `destination` directory,
    /// optionally renaming the copy.
    pub fn copy_file(
        &mut self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        new_name: Option<&str>,
    ) -> Result<()> {
        let source = source.as_ref();
        self.ensure_open()?;
        let src = item::resolve_item(source, false)?;
        let dst = item::resolve_item(destination.as_ref(), true)?;
        let wide_name = new_name.map(|n| to_wide(OsStr::new(n)));
        let engine = self.engine_mut()?;
        unsafe {
            engine.op.CopyItem(
                &src,
                &dst,
                opt_pcwstr(wide_name.as_ref()),
                None::<&IFileOperationProgressSink>,
            )
        }
        .map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", source = %source.display(), "queued copy");
        Ok(())
    }

    /// Schedule a copy of several sources into the `destination` directory.
    pub fn copy_files<I, P>(&mut self, sources: I, destination: impl AsRef<Path>) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ensure_open()?;
        let items = item::resolve_items(sources)?;
        let dst = item::resolve_item(destination.as_ref(), true)?;
        let engine = self.engine_mut()?;
        unsafe { engine.op.CopyItems(&items, &dst) }.map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", "queued batch copy");
        Ok(())
    }

    /// Schedule a rename of `source` to `new_name`.
    ///
    /// With `allow_move` set, a new name that names a different parent
    /// directory is redirected to the move logic, splitting it into
    /// destination directory plus file name; a bare name or one in the same
    /// directory queues a plain rename.
    pub fn rename_file(
        &mut self,
        source: impl AsRef<Path>,
        new_name: &str,
        allow_move: bool,
    ) -> Result<()> {
        let source = source.as_ref();
        let final_name = if allow_move {
            match split_rename_target(source, new_name) {
                RenameTarget::Move {
                    directory,
                    file_name,
                } => {
                    return self.move_file(source, directory, Some(&file_name));
                }
                RenameTarget::Rename(name) => name,
            }
        } else {
            new_name.to_string()
        };
        self.ensure_open()?;
        let src = item::resolve_item(source, false)?;
        let wide = to_wide(OsStr::new(&final_name));
        let engine = self.engine_mut()?;
        unsafe {
            engine.op.RenameItem(
                &src,
                PCWSTR(wide.as_ptr()),
                None::<&IFileOperationProgressSink>,
            )
        }
        .map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", source = %source.display(), "queued rename");
        Ok(())
    }

    /// Schedule a rename of several sources, all to the same new name; the
    /// engine uniquifies collisions according to the session flags.
    pub fn rename_files<I, P>(&mut self, sources: I, new_name: &str) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ensure_open()?;
        let items = item::resolve_items(sources)?;
        let wide = to_wide(OsStr::new(new_name));
        let engine = self.engine_mut()?;
        unsafe { engine.op.RenameItems(&items, PCWSTR(wide.as_ptr())) }
            .map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", "queued batch rename");
        Ok(())
    }

    /// Schedule a delete of `source`. Whether it is recycled or permanently
    /// deleted depends on the session flags and the engine's policy.
    pub fn delete_file(&mut self, source: impl AsRef<Path>) -> Result<()> {
        let source = source.as_ref();
        self.ensure_open()?;
        let src = item::resolve_item(source, false)?;
        let engine = self.engine_mut()?;
        unsafe {
            engine
                .op
                .DeleteItem(&src, None::<&IFileOperationProgressSink>)
        }
        .map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", source = %source.display(), "queued delete");
        Ok(())
    }

    /// Schedule a delete of several sources.
    pub fn delete_files<I, P>(&mut self, sources: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.ensure_open()?;
        let items = item::resolve_items(sources)?;
        let engine = self.engine_mut()?;
        unsafe { engine.op.DeleteItems(&items) }.map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", "queued batch delete");
        Ok(())
    }

    /// Schedule creation of a new item named `name` in the `destination`
    /// directory with the given attributes. A template file, when supplied,
    /// provides the initial content.
    pub fn new_item(
        &mut self,
        destination: impl AsRef<Path>,
        name: &str,
        attributes: FileAttributes,
        template: Option<&str>,
    ) -> Result<()> {
        self.ensure_open()?;
        let dst = item::resolve_item(destination.as_ref(), true)?;
        let wide_name = to_wide(OsStr::new(name));
        let wide_template = template.map(|t| to_wide(OsStr::new(t)));
        let engine = self.engine_mut()?;
        unsafe {
            engine.op.NewItem(
                &dst,
                attributes.bits(),
                PCWSTR(wide_name.as_ptr()),
                opt_pcwstr(wide_template.as_ref()),
                None::<&IFileOperationProgressSink>,
            )
        }
        .map_err(item::translate)?;
        engine.queued = true;
        trace!(target: "winshell", name, "queued new item");
        Ok(())
    }

    /// Perform all scheduled operations as one batch.
    ///
    /// Blocks until the engine finishes. A commit with nothing queued is the
    /// expected no-op: the engine's own unexpected-failure signal for that
    /// case is absorbed into an empty success summary. A failure recorded by
    /// the progress sink takes precedence over the engine's generic failure,
    /// so handler bugs are not hidden behind it.
    pub fn commit(&mut self) -> Result<CommitSummary> {
        let engine = self.engine_mut()?;
        debug!(target: "winshell", queued = engine.queued, "performing queued operations");
        let performed = unsafe { engine.op.PerformOperations() };
        let summary = match performed {
            Err(err) => {
                if let Some(failure) = engine.sink.borrow_mut().take_failure() {
                    return Err(failure);
                }
                let translated = item::translate(err);
                if matches!(translated, OpError::Unexpected) && !engine.queued {
                    CommitSummary::empty()
                } else {
                    return Err(translated);
                }
            }
            Ok(()) => {
                let aborted = unsafe { engine.op.GetAnyOperationsAborted() }
                    .map_err(item::translate)?
                    .as_bool();
                let mut sink = engine.sink.borrow_mut();
                if let Some(failure) = sink.take_failure() {
                    return Err(failure);
                }
                let outcomes = sink.take_outcomes();
                let code = sink.result_code().unwrap_or(ResultCode::S_OK);
                CommitSummary {
                    outcomes,
                    aborted,
                    code,
                }
            }
        };
        if let Some(engine) = self.engine.as_mut() {
            engine.committed = true;
        }
        debug!(
            target: "winshell",
            outcomes = summary.outcomes.len(),
            aborted = summary.aborted,
            "commit finished"
        );
        self.last = Some(summary.clone());
        Ok(summary)
    }

    /// Leave the scope: release the sink registration and discard the
    /// engine. The operator becomes unusable until reopened.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Some(engine) = self.engine.take() {
            if let Err(err) = unsafe { engine.op.Unadvise(engine.cookie) } {
                debug!(target: "winshell", error = %err, "sink unregistration failed");
            }
            self.handler = engine.sink.borrow_mut().take_handler();
        }
        self.state = SessionState::Closed;
        debug!(target: "winshell", "file operation session closed");
        Ok(())
    }

    /// Run `f` inside a scope: open, run, auto-commit on success when
    /// configured, and close on every exit path.
    pub fn session<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.open()?;
        match f(self) {
            Ok(value) => {
                let pending = self
                    .engine
                    .as_ref()
                    .map(|engine| !engine.committed)
                    .unwrap_or(false);
                if self.commit_on_close && pending {
                    if let Err(err) = self.commit() {
                        let _ = self.close();
                        return Err(err);
                    }
                }
                self.close()?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.close();
                Err(err)
            }
        }
    }
}

impl Drop for FileOperator {
    fn drop(&mut self) {
        // An abandoned open scope still releases its sink registration.
        if let Some(engine) = self.engine.take() {
            let _ = unsafe { engine.op.Unadvise(engine.cookie) };
        }
    }
}

fn opt_pcwstr(wide: Option<&Vec<u16>>) -> PCWSTR {
    wide.map(|w| PCWSTR(w.as_ptr())).unwrap_or_else(PCWSTR::null)
}

enum RenameTarget {
    Rename(String),
    Move {
        directory: PathBuf,
        file_name: String,
    },
}

/// Decide whether a rename target names a file in a different directory, in
/// which case the rename is really a move of parent-directory + file name.
fn split_rename_target(source: &Path, new_name: &str) -> RenameTarget {
    let target = Path::new(new_name);
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return RenameTarget::Rename(new_name.to_string()),
    };
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| new_name.to_string());
    if source.parent() == Some(parent) {
        RenameTarget::Rename(file_name)
    } else {
        RenameTarget::Move {
            directory: parent.to_path_buf(),
            file_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_is_plain_rename() {
        let target = split_rename_target(Path::new(r"C:\a\f.txt"), "g.txt");
        assert!(matches!(target, RenameTarget::Rename(name) if name == "g.txt"));
    }

    #[test]
    fn test_same_directory_path_is_plain_rename() {
        let target = split_rename_target(Path::new(r"C:\a\f.txt"), r"C:\a\g.txt");
        assert!(matches!(target, RenameTarget::Rename(name) if name == "g.txt"));
    }

    #[test]
    fn test_other_directory_path_becomes_move() {
        let target = split_rename_target(Path::new(r"C:\a\f.txt"), r"C:\b\g.txt");
        match target {
            RenameTarget::Move {
                directory,
                file_name,
            } => {
                assert_eq!(directory, PathBuf::from(r"C:\b"));
                assert_eq!(file_name, "g.txt");
            }
            RenameTarget::Rename(name) => panic!("expected move, got rename to {name}"),
        }
    }

    #[test]
    fn test_relative_subdirectory_becomes_move() {
        let target = split_rename_target(Path::new(r"C:\a\f.txt"), r"sub\g.txt");
        assert!(matches!(target, RenameTarget::Move { .. }));
    }
}
