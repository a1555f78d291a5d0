//! Bind context used to resolve not-yet-existing destination paths.
//!
//! Destination directories for move/copy operations frequently do not exist
//! at resolution time. The shell accepts a bind context carrying synthetic
//! find data under the "File System Bind Data" parameter; marking the data
//! as a directory makes the parser hand back a usable item for a path that
//! is not on disk.

use std::cell::{Cell, OnceCell};

use windows::core::{Result, implement};
use windows::Win32::Foundation::E_POINTER;
use windows::Win32::Storage::FileSystem::WIN32_FIND_DATAW;
use windows::Win32::System::Com::{CreateBindCtx, IBindCtx};
use windows::Win32::UI::Shell::{
    IFileSystemBindData, IFileSystemBindData_Impl, STR_FILE_SYS_BIND_DATA,
};

use winshell_core::FileAttributes;

/// Find-data holder handed to the parser through the bind context.
#[implement(IFileSystemBindData)]
struct FolderBindData {
    find_data: Cell<WIN32_FIND_DATAW>,
}

impl IFileSystemBindData_Impl for FolderBindData_Impl {
    fn SetFindData(&self, pfd: *const WIN32_FIND_DATAW) -> Result<()> {
        if pfd.is_null() {
            return Err(E_POINTER.into());
        }
        self.find_data.set(unsafe { *pfd });
        Ok(())
    }

    fn GetFindData(&self, pfd: *mut WIN32_FIND_DATAW) -> Result<()> {
        if pfd.is_null() {
            return Err(E_POINTER.into());
        }
        unsafe { *pfd = self.find_data.get() };
        Ok(())
    }
}

fn create_folder_bind_ctx() -> Result<IBindCtx> {
    let mut find_data = WIN32_FIND_DATAW::default();
    find_data.dwFileAttributes = FileAttributes::DIRECTORY.bits();

    let data: IFileSystemBindData = FolderBindData {
        find_data: Cell::new(find_data),
    }
    .into();

    let ctx = unsafe { CreateBindCtx(0) }?;
    unsafe { ctx.RegisterObjectParam(STR_FILE_SYS_BIND_DATA, &data) }?;
    Ok(ctx)
}

thread_local! {
    // Interface pointers are apartment-bound, so the shared directory-marking
    // context is per thread. The find data never changes after construction.
    static FOLDER_BIND_CTX: OnceCell<IBindCtx> = const { OnceCell::new() };
}

/// The lazily-built bind context that marks a nonexistent path as a
/// directory, shared by every forced resolution on the calling thread.
pub(crate) fn folder_bind_ctx() -> Result<IBindCtx> {
    FOLDER_BIND_CTX.with(|cell| {
        if let Some(ctx) = cell.get() {
            return Ok(ctx.clone());
        }
        let ctx = create_folder_bind_ctx()?;
        let _ = cell.set(ctx.clone());
        Ok(ctx)
    })
}
