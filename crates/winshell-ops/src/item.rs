//! Name resolution: filesystem paths to shell item handles.
//!
//! Items are resolved once per path per call; nothing is cached across
//! calls, and resolution never touches the disk beyond the lookup itself.

use std::ffi::{OsStr, c_void};
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use windows::core::PCWSTR;
use windows::Win32::System::Com::CoTaskMemFree;
use windows::Win32::UI::Shell::Common::ITEMIDLIST;
use windows::Win32::UI::Shell::{
    IShellItem, IShellItemArray, SHCreateItemFromParsingName, SHCreateShellItemArrayFromIDLists,
    SHParseDisplayName, SIGDN_FILESYSPATH, SIGDN_NORMALDISPLAY,
};

use winshell_core::{OpError, Result, ResultCode};

use crate::apartment::ensure_com_initialized;
use crate::bind::folder_bind_ctx;

/// Translate an engine failure at the call boundary.
///
/// Sign representation is normalized before classification; nothing above
/// this boundary re-interprets codes.
pub(crate) fn translate(err: windows::core::Error) -> OpError {
    OpError::from_code(ResultCode::from_signed(err.code().0), err.message())
}

/// Nul-terminated UTF-16 form of an OS string.
pub(crate) fn to_wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(std::iter::once(0)).collect()
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|_| OpError::NotFound {
        path: path.to_path_buf(),
    })
}

/// Resolve a path to a shell item.
///
/// With `force` set, a path that does not exist on disk is retried with the
/// directory-marking bind context, yielding an item usable as a move/copy
/// destination; without it, a missing path is [`OpError::NotFound`].
pub fn resolve_item(path: impl AsRef<Path>, force: bool) -> Result<IShellItem> {
    ensure_com_initialized();
    let absolute = absolutize(path.as_ref())?;
    let wide = to_wide(absolute.as_os_str());

    let parsed: windows::core::Result<IShellItem> =
        unsafe { SHCreateItemFromParsingName(PCWSTR(wide.as_ptr()), None) };
    match parsed {
        Ok(item) => Ok(item),
        Err(err) if ResultCode::from_signed(err.code().0).is_not_found() => {
            if force {
                let ctx = folder_bind_ctx().map_err(translate)?;
                unsafe { SHCreateItemFromParsingName(PCWSTR(wide.as_ptr()), Some(&ctx)) }
                    .map_err(translate)
            } else {
                Err(OpError::NotFound { path: absolute })
            }
        }
        Err(err) => Err(translate(err)),
    }
}

/// Owned ID list pointers, freed on every exit path.
struct PidlList {
    pidls: Vec<*mut ITEMIDLIST>,
}

impl PidlList {
    fn new() -> Self {
        Self { pidls: Vec::new() }
    }

    fn as_const_ptrs(&self) -> Vec<*const ITEMIDLIST> {
        self.pidls.iter().map(|p| *p as *const ITEMIDLIST).collect()
    }
}

impl Drop for PidlList {
    fn drop(&mut self) {
        for pidl in self.pidls.drain(..) {
            unsafe { CoTaskMemFree(Some(pidl as *const c_void)) };
        }
    }
}

/// Resolve several paths into a shell item array for the batch operation
/// forms. Every path must already exist.
pub(crate) fn resolve_items<I, P>(paths: I) -> Result<IShellItemArray>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    ensure_com_initialized();
    let mut pidls = PidlList::new();

    for path in paths {
        let absolute = absolutize(path.as_ref())?;
        let wide = to_wide(absolute.as_os_str());
        let mut pidl: *mut ITEMIDLIST = std::ptr::null_mut();
        let parsed = unsafe { SHParseDisplayName(PCWSTR(wide.as_ptr()), None, &mut pidl, 0, None) };
        if let Err(err) = parsed {
            if ResultCode::from_signed(err.code().0).is_not_found() {
                return Err(OpError::NotFound { path: absolute });
            }
            return Err(translate(err));
        }
        pidls.pidls.push(pidl);
    }

    if pidls.pidls.is_empty() {
        return Err(OpError::OperationFailed {
            code: ResultCode::E_INVALID_ARG,
            message: "no source paths supplied".into(),
        });
    }

    let ids = pidls.as_const_ptrs();
    unsafe { SHCreateShellItemArrayFromIDLists(&ids) }.map_err(translate)
}

/// Human-readable path for a shell item: the filesystem display form when
/// the item has filesystem backing, the generic display form otherwise
/// (intermediate states during a commit may carry no filesystem path).
pub(crate) fn display_path(item: &IShellItem) -> Option<String> {
    for sigdn in [SIGDN_FILESYSPATH, SIGDN_NORMALDISPLAY] {
        let name = unsafe { item.GetDisplayName(sigdn) };
        if let Ok(buf) = name {
            if buf.is_null() {
                continue;
            }
            let text = unsafe { buf.to_string() }.ok();
            unsafe { CoTaskMemFree(Some(buf.as_ptr() as *const c_void)) };
            match text {
                Some(text) if !text.is_empty() => return Some(text),
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_wide_appends_terminator() {
        let wide = to_wide(OsStr::new(r"C:\a"));
        assert_eq!(wide.len(), 5);
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(wide[0], u16::from(b'C'));
    }
}
