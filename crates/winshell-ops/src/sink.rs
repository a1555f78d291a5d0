//! Progress-sink bridge between the engine's callback interface and
//! user-overridable handler methods.
//!
//! The engine invokes the native callback interface synchronously on the
//! committing thread for every item life-cycle event. The adapter here
//! converts item handles to display paths and raw flag integers to the
//! symbolic flag types before forwarding, and it never lets a handler error
//! or panic cross back into the native call stack: failures become the
//! generic native failure code, which aborts the remaining batch, and the
//! original error is recorded for the session to surface after the commit
//! unwinds.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::rc::Rc;

use tracing::trace;
use windows::core::{HRESULT, PCWSTR, Ref, implement};
use windows::Win32::Foundation::E_FAIL;
use windows::Win32::UI::Shell::{
    IFileOperationProgressSink, IFileOperationProgressSink_Impl, IShellItem,
};

use winshell_core::{
    FileAttributes, ItemOutcome, OpError, OutcomeMap, Result, ResultCode, TransferFlags,
};

use crate::item;

/// User-overridable callbacks for per-item life-cycle events.
///
/// Implement any subset; every method defaults to doing nothing. Returning
/// an error from a method aborts the remaining batch and surfaces the error
/// from the session's commit.
///
/// The engine may invoke a `pre_*`/`post_*` pair multiple times for the same
/// logical item while interactive collision resolution is pending; each
/// `post_*` then carries a provisional result. The operation is final when a
/// `new_path` is actually supplied.
pub trait ProgressHandler {
    /// The batch is about to begin.
    fn start_operations(&mut self) -> Result<()> {
        Ok(())
    }

    /// The batch finished; `result` is the overall code for the whole batch.
    /// Invoked exactly once per commit, last.
    fn finish_operations(&mut self, _result: ResultCode) -> Result<()> {
        Ok(())
    }

    fn pre_rename_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _new_name: &str,
    ) -> Result<()> {
        Ok(())
    }

    /// `new_path` is the full path of the renamed item, absent while the
    /// operation is pending or when it failed.
    fn post_rename_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _new_path: Option<&str>,
        _result: ResultCode,
    ) -> Result<()> {
        Ok(())
    }

    fn pre_move_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _destination: &str,
        _new_name: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn post_move_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _destination: &str,
        _new_path: Option<&str>,
        _result: ResultCode,
    ) -> Result<()> {
        Ok(())
    }

    fn pre_copy_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _destination: &str,
        _new_name: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn post_copy_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _destination: &str,
        _new_path: Option<&str>,
        _result: ResultCode,
    ) -> Result<()> {
        Ok(())
    }

    fn pre_delete_item(&mut self, _flags: TransferFlags, _source: &str) -> Result<()> {
        Ok(())
    }

    /// `recycled` is true when the engine sent the item to the Recycle Bin
    /// rather than permanently deleting it; the engine decides this, not the
    /// caller.
    fn post_delete_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _result: ResultCode,
        _recycled: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn pre_new_item(
        &mut self,
        _flags: TransferFlags,
        _destination: &str,
        _new_name: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn post_new_item(
        &mut self,
        _flags: TransferFlags,
        _destination: &str,
        _new_path: Option<&str>,
        _attributes: FileAttributes,
        _result: ResultCode,
    ) -> Result<()> {
        Ok(())
    }

    /// Periodic progress, in engine-defined work units.
    fn update_progress(&mut self, _work_total: u32, _work_so_far: u32) -> Result<()> {
        Ok(())
    }

    fn reset_timer(&mut self) -> Result<()> {
        Ok(())
    }

    fn pause_timer(&mut self) -> Result<()> {
        Ok(())
    }

    fn resume_timer(&mut self) -> Result<()> {
        Ok(())
    }
}

/// State the sink accumulates during one commit cycle.
///
/// Owned by the sink while the engine runs; the session takes the finished
/// pieces once commit returns.
pub(crate) struct SinkState {
    outcomes: OutcomeMap,
    result: Option<ResultCode>,
    handler: Option<Box<dyn ProgressHandler>>,
    failure: Option<OpError>,
}

impl SinkState {
    pub(crate) fn new(handler: Option<Box<dyn ProgressHandler>>) -> Self {
        Self {
            outcomes: OutcomeMap::new(),
            result: None,
            handler,
            failure: None,
        }
    }

    pub(crate) fn take_outcomes(&mut self) -> OutcomeMap {
        std::mem::take(&mut self.outcomes)
    }

    pub(crate) fn take_failure(&mut self) -> Option<OpError> {
        self.failure.take()
    }

    pub(crate) fn take_handler(&mut self) -> Option<Box<dyn ProgressHandler>> {
        self.handler.take()
    }

    pub(crate) fn result_code(&self) -> Option<ResultCode> {
        self.result
    }

    fn record_failure(&mut self, err: OpError) {
        // Only the first failure is kept; later callbacks fail fast anyway.
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    fn with_handler(
        &mut self,
        f: impl FnOnce(&mut dyn ProgressHandler) -> Result<()>,
    ) -> Result<()> {
        match self.handler.as_deref_mut() {
            Some(handler) => f(handler),
            None => Ok(()),
        }
    }
}

/// COM adapter implementing the engine's progress callback interface.
#[implement(IFileOperationProgressSink)]
pub(crate) struct OperationSink {
    state: Rc<RefCell<SinkState>>,
}

impl OperationSink {
    pub(crate) fn new(state: Rc<RefCell<SinkState>>) -> Self {
        Self { state }
    }
}

fn display_of(item: &Ref<'_, IShellItem>) -> Option<String> {
    (**item).as_ref().and_then(item::display_path)
}

fn string_of(text: &PCWSTR) -> Option<String> {
    if text.is_null() {
        None
    } else {
        unsafe { text.to_string() }.ok()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "progress handler panicked".to_string()
    }
}

impl OperationSink_Impl {
    /// Run a callback body against the sink state, converting any error or
    /// panic into the generic native failure code. An unwind must never
    /// cross the interface boundary; the engine cannot propagate it and
    /// would corrupt its own control flow.
    fn guard(
        &self,
        f: impl FnOnce(&mut SinkState) -> Result<()>,
    ) -> windows::core::Result<()> {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut state = self.state.borrow_mut();
            f(&mut state)
        }));
        let failure = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err,
            Err(payload) => OpError::Handler {
                message: panic_message(payload.as_ref()),
            },
        };
        self.state.borrow_mut().record_failure(failure);
        Err(E_FAIL.into())
    }
}

impl IFileOperationProgressSink_Impl for OperationSink_Impl {
    fn StartOperations(&self) -> windows::core::Result<()> {
        self.guard(|state| state.with_handler(|h| h.start_operations()))
    }

    fn FinishOperations(&self, hrresult: HRESULT) -> windows::core::Result<()> {
        let code = ResultCode::from_signed(hrresult.0);
        trace!(target: "winshell", %code, "operations finished");
        self.guard(|state| {
            state.result = Some(code);
            state.with_handler(|h| h.finish_operations(code))
        })
    }

    fn PreRenameItem(
        &self,
        dwflags: u32,
        psiitem: Ref<'_, IShellItem>,
        psznewname: &PCWSTR,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let source = display_of(&psiitem);
        let new_name = string_of(psznewname);
        self.guard(|state| {
            state.with_handler(|h| {
                h.pre_rename_item(
                    flags,
                    source.as_deref().unwrap_or_default(),
                    new_name.as_deref().unwrap_or_default(),
                )
            })
        })
    }

    fn PostRenameItem(
        &self,
        dwflags: u32,
        psiitem: Ref<'_, IShellItem>,
        _psznewname: &PCWSTR,
        hrrename: HRESULT,
        psinewlycreated: Ref<'_, IShellItem>,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let source = display_of(&psiitem);
        let new_path = display_of(&psinewlycreated);
        let code = ResultCode::from_signed(hrrename.0);
        self.guard(|state| {
            if let (Some(source), Some(new_path)) = (source.as_deref(), new_path.as_deref()) {
                state
                    .outcomes
                    .insert(PathBuf::from(source), ItemOutcome::NewPath(PathBuf::from(new_path)));
            }
            state.with_handler(|h| {
                h.post_rename_item(
                    flags,
                    source.as_deref().unwrap_or_default(),
                    new_path.as_deref(),
                    code,
                )
            })
        })
    }

    fn PreMoveItem(
        &self,
        dwflags: u32,
        psiitem: Ref<'_, IShellItem>,
        psidestinationfolder: Ref<'_, IShellItem>,
        psznewname: &PCWSTR,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let source = display_of(&psiitem);
        let destination = display_of(&psidestinationfolder);
        let new_name = string_of(psznewname);
        self.guard(|state| {
            state.with_handler(|h| {
                h.pre_move_item(
                    flags,
                    source.as_deref().unwrap_or_default(),
                    destination.as_deref().unwrap_or_default(),
                    new_name.as_deref().unwrap_or_default(),
                )
            })
        })
    }

    fn PostMoveItem(
        &self,
        dwflags: u32,
        psiitem: Ref<'_, IShellItem>,
        psidestinationfolder: Ref<'_, IShellItem>,
        _psznewname: &PCWSTR,
        hrmove: HRESULT,
        psinewlycreated: Ref<'_, IShellItem>,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let source = display_of(&psiitem);
        let destination = display_of(&psidestinationfolder);
        let new_path = display_of(&psinewlycreated);
        let code = ResultCode::from_signed(hrmove.0);
        self.guard(|state| {
            if let (Some(source), Some(new_path)) = (source.as_deref(), new_path.as_deref()) {
                state
                    .outcomes
                    .insert(PathBuf::from(source), ItemOutcome::NewPath(PathBuf::from(new_path)));
            }
            state.with_handler(|h| {
                h.post_move_item(
                    flags,
                    source.as_deref().unwrap_or_default(),
                    destination.as_deref().unwrap_or_default(),
                    new_path.as_deref(),
                    code,
                )
            })
        })
    }

    fn PreCopyItem(
        &self,
        dwflags: u32,
        psiitem: Ref<'_, IShellItem>,
        psidestinationfolder: Ref<'_, IShellItem>,
        psznewname: &PCWSTR,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let source = display_of(&psiitem);
        let destination = display_of(&psidestinationfolder);
        let new_name = string_of(psznewname);
        self.guard(|state| {
            state.with_handler(|h| {
                h.pre_copy_item(
                    flags,
                    source.as_deref().unwrap_or_default(),
                    destination.as_deref().unwrap_or_default(),
                    new_name.as_deref().unwrap_or_default(),
                )
            })
        })
    }

    fn PostCopyItem(
        &self,
        dwflags: u32,
        psiitem: Ref<'_, IShellItem>,
        psidestinationfolder: Ref<'_, IShellItem>,
        _psznewname: &PCWSTR,
        hrcopy: HRESULT,
        psinewlycreated: Ref<'_, IShellItem>,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let source = display_of(&psiitem);
        let destination = display_of(&psidestinationfolder);
        let new_path = display_of(&psinewlycreated);
        let code = ResultCode::from_signed(hrcopy.0);
        self.guard(|state| {
            if let (Some(source), Some(new_path)) = (source.as_deref(), new_path.as_deref()) {
                state
                    .outcomes
                    .insert(PathBuf::from(source), ItemOutcome::NewPath(PathBuf::from(new_path)));
            }
            state.with_handler(|h| {
                h.post_copy_item(
                    flags,
                    source.as_deref().unwrap_or_default(),
                    destination.as_deref().unwrap_or_default(),
                    new_path.as_deref(),
                    code,
                )
            })
        })
    }

    fn PreDeleteItem(
        &self,
        dwflags: u32,
        psiitem: Ref<'_, IShellItem>,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let source = display_of(&psiitem);
        self.guard(|state| {
            state.with_handler(|h| h.pre_delete_item(flags, source.as_deref().unwrap_or_default()))
        })
    }

    fn PostDeleteItem(
        &self,
        dwflags: u32,
        psiitem: Ref<'_, IShellItem>,
        hrdelete: HRESULT,
        psinewlycreated: Ref<'_, IShellItem>,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let source = display_of(&psiitem);
        let code = ResultCode::from_signed(hrdelete.0);
        // A newly created item accompanies a delete only when the engine
        // recycled the source instead of destroying it.
        let recycled = (*psinewlycreated).is_some();
        self.guard(|state| {
            if let Some(source) = source.as_deref() {
                if code.is_success() {
                    let outcome = if recycled {
                        ItemOutcome::Recycled
                    } else {
                        ItemOutcome::Deleted
                    };
                    state.outcomes.insert(PathBuf::from(source), outcome);
                }
            }
            state.with_handler(|h| {
                h.post_delete_item(flags, source.as_deref().unwrap_or_default(), code, recycled)
            })
        })
    }

    fn PreNewItem(
        &self,
        dwflags: u32,
        psidestinationfolder: Ref<'_, IShellItem>,
        psznewname: &PCWSTR,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let destination = display_of(&psidestinationfolder);
        let new_name = string_of(psznewname);
        self.guard(|state| {
            state.with_handler(|h| {
                h.pre_new_item(
                    flags,
                    destination.as_deref().unwrap_or_default(),
                    new_name.as_deref().unwrap_or_default(),
                )
            })
        })
    }

    fn PostNewItem(
        &self,
        dwflags: u32,
        psidestinationfolder: Ref<'_, IShellItem>,
        _psznewname: &PCWSTR,
        _psztemplatename: &PCWSTR,
        dwfileattributes: u32,
        hrnew: HRESULT,
        psinewitem: Ref<'_, IShellItem>,
    ) -> windows::core::Result<()> {
        let flags = TransferFlags::from_bits_retain(dwflags);
        let destination = display_of(&psidestinationfolder);
        let new_path = display_of(&psinewitem);
        let attributes = FileAttributes::from_bits_retain(dwfileattributes);
        let code = ResultCode::from_signed(hrnew.0);
        self.guard(|state| {
            state.with_handler(|h| {
                h.post_new_item(
                    flags,
                    destination.as_deref().unwrap_or_default(),
                    new_path.as_deref(),
                    attributes,
                    code,
                )
            })
        })
    }

    fn UpdateProgress(&self, iworktotal: u32, iworksofar: u32) -> windows::core::Result<()> {
        self.guard(|state| state.with_handler(|h| h.update_progress(iworktotal, iworksofar)))
    }

    fn ResetTimer(&self) -> windows::core::Result<()> {
        self.guard(|state| state.with_handler(|h| h.reset_timer()))
    }

    fn PauseTimer(&self) -> windows::core::Result<()> {
        self.guard(|state| state.with_handler(|h| h.pause_timer()))
    }

    fn ResumeTimer(&self) -> windows::core::Result<()> {
        self.guard(|state| state.with_handler(|h| h.resume_timer()))
    }
}
