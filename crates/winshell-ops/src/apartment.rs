//! Per-thread COM apartment management.
//!
//! The shell engine requires an initialized apartment on whichever thread
//! drives it. Initialization happens lazily on first use and is balanced at
//! thread exit, so any number of worker threads can each run their own
//! session without coordinating.

use windows::Win32::System::Com::{
    CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED, COINIT_DISABLE_OLE1DDE,
};

struct ComApartment {
    initialized: bool,
}

impl ComApartment {
    fn init() -> Self {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED | COINIT_DISABLE_OLE1DDE) };
        // RPC_E_CHANGED_MODE means another component already initialized the
        // thread with a different model; the apartment is usable, but the
        // balancing uninitialize is not ours to call.
        Self {
            initialized: hr.is_ok(),
        }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.initialized {
            unsafe { CoUninitialize() };
        }
    }
}

thread_local! {
    static APARTMENT: ComApartment = ComApartment::init();
}

/// Make sure the calling thread has an initialized COM apartment.
pub(crate) fn ensure_com_initialized() {
    APARTMENT.with(|_| {});
}
