//! Flag tables for the shell file-operation engine.
//!
//! These are fixed external constants: every bit value must match the
//! platform's published numeric layout, so the engine and the callbacks it
//! delivers agree with what callers compose here.

use bitflags::bitflags;

bitflags! {
    /// File attribute bits as used in a `WIN32_FIND_DATAW` structure and in
    /// post-new-item callbacks.
    ///
    /// See the file-attribute-constants page of the platform documentation
    /// for the semantics of each bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAttributes: u32 {
        /// Marked for backup or removal.
        const ARCHIVE = 0x20;
        /// Compressed file, or compression-default directory.
        const COMPRESSED = 0x800;
        /// Reserved for system use.
        const DEVICE = 0x40;
        /// The handle identifies a directory.
        const DIRECTORY = 0x10;
        /// Encrypted file, or encryption-default directory.
        const ENCRYPTED = 0x4000;
        /// Hidden; excluded from ordinary directory listings.
        const HIDDEN = 0x2;
        /// Configured with integrity (ReFS only).
        const INTEGRITY_STREAM = 0x8000;
        /// No other attributes set; only valid alone.
        const NORMAL = 0x80;
        /// Not indexed by the content indexing service.
        const NOT_CONTENT_INDEXED = 0x2000;
        /// Excluded from the background data integrity scanner.
        const NO_SCRUB_DATA = 0x20000;
        /// Data physically moved to offline storage.
        const OFFLINE = 0x1000;
        /// Read-only; not honored on directories.
        const READONLY = 0x1;
        /// Not fully present locally; access recalls from remote storage.
        const RECALL_ON_DATA_ACCESS = 0x400000;
        /// No local representation; open recalls from remote storage.
        const RECALL_ON_OPEN = 0x40000;
        /// Has an associated reparse point, or is a symbolic link.
        const REPARSE_POINT = 0x400;
        /// Sparse file.
        const SPARSE_FILE = 0x200;
        /// Used partly or exclusively by the operating system.
        const SYSTEM = 0x4;
        /// Temporary storage; file systems avoid flushing the data.
        const TEMPORARY = 0x100;
        /// Reserved for system use.
        const VIRTUAL = 0x10000;
        /// Keep fully present locally (hierarchical storage management).
        const PINNED = 0x80000;
        /// Do not keep fully present locally except when accessed.
        const UNPINNED = 0x200000;
    }
}

bitflags! {
    /// Behavior flags for a file-operation session, applied before any
    /// operation is queued.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OperationFlags: u32 {
        /// Allow the operation to be undone.
        const ALLOW_UNDO = 0x40;
        /// Only operate on files, not folders, if a wildcard is used.
        const FILES_ONLY = 0x80;
        /// Respond to any dialog box as if "Yes to All" were chosen.
        const NO_CONFIRMATION = 0x10;
        /// Do not confirm the creation of a needed destination directory.
        const NO_CONFIRM_MKDIR = 0x200;
        /// Do not move connected elements as a group.
        const NO_CONNECTED_ELEMENTS = 0x2000;
        /// Do not copy the security attributes of the file.
        const NO_COPY_SECURITY_ATTRIBS = 0x800;
        /// Do not display error UI; without EARLY_FAILURE the failed action
        /// is skipped, the aborted flag is set, and the batch continues.
        const NO_ERROR_UI = 0x400;
        /// Only operate in the local folder, never recursively.
        const NO_RECURSION = 0x8000;
        /// Give the item a new name if the target name already exists.
        const RENAME_ON_COLLISION = 0x8;
        /// Do not display a progress dialog box.
        const SILENT = 0x4;
        /// Warn when a delete destroys a file rather than recycling it.
        const WANT_NUKE_WARNING = 0x1000;
        /// User-invoked operation; place it on the undo stack (Windows 8+,
        /// preferred over ALLOW_UNDO).
        const ADD_UNDO_RECORD = 0x20000000;
        /// Walk into Shell namespace junctions.
        const NO_SKIP_JUNCTIONS = 0x10000;
        /// Create a hard link rather than a new file instance if possible.
        const PREFER_HARDLINK = 0x20000;
        /// Show a UAC prompt even when NO_ERROR_UI suppressed error UI.
        const SHOW_ELEVATION_PROMPT = 0x40000;
        /// With NO_ERROR_UI, stop the entire batch on the first error.
        const EARLY_FAILURE = 0x100000;
        /// With RENAME_ON_COLLISION, preserve file name extensions.
        const PRESERVE_FILE_EXTENSIONS = 0x200000;
        /// Keep the newer item on collision, without prompting.
        const KEEP_NEWER_FILE = 0x400000;
        /// Do not use copy hooks.
        const NO_COPY_HOOKS = 0x800000;
        /// Do not allow the progress dialog to be minimized.
        const NO_MINIMIZE_BOX = 0x1000000;
        /// Copy source security attributes on a cross-volume move.
        const MOVE_ACLS_ACROSS_VOLUMES = 0x2000000;
        /// Do not display the source path in the progress dialog.
        const DONT_DISPLAY_SOURCE_PATH = 0x4000000;
        /// Do not display the destination path in the progress dialog.
        const DONT_DISPLAY_DEST_PATH = 0x8000000;
        /// Send deleted items to the Recycle Bin (Windows 8+).
        const RECYCLE_ON_DELETE = 0x80000;
        /// The user expects an elevation requirement; skip the confirmation
        /// dialog (Vista SP1+).
        const REQUIRE_ELEVATION = 0x10000000;
        /// Display "Downloading" instead of "Copying" (Windows 7+).
        const COPY_AS_DOWNLOAD = 0x40000000;
        /// Do not display the location line in the progress dialog
        /// (Windows 7+).
        const DONT_DISPLAY_LOCATIONS = 0x80000000;
    }
}

impl OperationFlags {
    /// Standard flags to allow operations to be undone with Ctrl+Z.
    pub const UNDO: Self = Self::ADD_UNDO_RECORD
        .union(Self::ALLOW_UNDO)
        .union(Self::RECYCLE_ON_DELETE);

    /// Suppress progress dialogs, but still show dialogs for name collisions
    /// and temporary errors, letting the user Try Again or Skip.
    pub const SEMI_SILENT: Self = Self::WANT_NUKE_WARNING
        .union(Self::SILENT)
        .union(Self::NO_CONFIRM_MKDIR);

    /// Suppress all dialogs (as if "Yes to All" were selected) except a UAC
    /// prompt if one is necessary; errors fail the batch immediately.
    pub const FULL_SILENT: Self = Self::SILENT
        .union(Self::NO_CONFIRMATION)
        .union(Self::NO_ERROR_UI)
        .union(Self::EARLY_FAILURE)
        .union(Self::NO_CONFIRM_MKDIR)
        .union(Self::SHOW_ELEVATION_PROMPT);
}

bitflags! {
    /// Flags delivered in pre/post callback events. These arrive from the
    /// engine and are never passed back into it; the empty set is the
    /// documented NORMAL / fail-if-exists state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TransferFlags: u32 {
        /// Rename with auto-name generation if the destination exists.
        const RENAME_EXIST = 0x1;
        /// Overwrite or merge with the destination.
        const OVERWRITE_EXIST = 0x2;
        /// Allow creation of a decrypted destination.
        const ALLOW_DECRYPTION = 0x4;
        /// No DACL, SACL, or owner.
        const NO_SECURITY = 0x8;
        /// Copy the creation time as part of the copy.
        const COPY_CREATION_TIME = 0x10;
        /// Copy the last write time as part of the copy.
        const COPY_WRITE_TIME = 0x20;
        /// Assign write, read, and delete permissions as share mode.
        const USE_FULL_ACCESS = 0x40;
        /// Recycle on file delete, if possible.
        const DELETE_RECYCLE_IF_POSSIBLE = 0x80;
        /// Hard link to the source instead of a normal copy.
        const COPY_HARD_LINK = 0x100;
        /// Copy the localized name.
        const COPY_LOCALIZED_NAME = 0x200;
        /// Move as a copy and delete operation.
        const MOVE_AS_COPY_DELETE = 0x400;
        /// Suspend Shell events.
        const SUSPEND_SHELL_EVENTS = 0x800;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_bits_match_platform_values() {
        assert_eq!(FileAttributes::READONLY.bits(), 0x1);
        assert_eq!(FileAttributes::DIRECTORY.bits(), 0x10);
        assert_eq!(FileAttributes::NORMAL.bits(), 0x80);
        assert_eq!(FileAttributes::REPARSE_POINT.bits(), 0x400);
        assert_eq!(FileAttributes::RECALL_ON_DATA_ACCESS.bits(), 0x400000);
    }

    #[test]
    fn test_operation_flag_bits_match_platform_values() {
        assert_eq!(OperationFlags::SILENT.bits(), 0x4);
        assert_eq!(OperationFlags::ALLOW_UNDO.bits(), 0x40);
        assert_eq!(OperationFlags::RECYCLE_ON_DELETE.bits(), 0x80000);
        assert_eq!(OperationFlags::ADD_UNDO_RECORD.bits(), 0x20000000);
        assert_eq!(OperationFlags::DONT_DISPLAY_LOCATIONS.bits(), 0x80000000);
    }

    #[test]
    fn test_flag_presets_compose() {
        assert_eq!(OperationFlags::UNDO.bits(), 0x20000000 | 0x40 | 0x80000);
        assert_eq!(
            OperationFlags::SEMI_SILENT.bits(),
            0x1000 | 0x4 | 0x200
        );
        assert_eq!(
            OperationFlags::FULL_SILENT.bits(),
            0x4 | 0x10 | 0x400 | 0x100000 | 0x200 | 0x40000
        );
    }

    #[test]
    fn test_transfer_flags_retain_unknown_bits() {
        let raw = 0x402u32;
        let flags = TransferFlags::from_bits_retain(raw);
        assert!(flags.contains(TransferFlags::MOVE_AS_COPY_DELETE));
        assert_eq!(flags.bits(), raw);

        // Unknown future bits survive the round trip untouched.
        let odd = TransferFlags::from_bits_retain(0x10000);
        assert_eq!(odd.bits(), 0x10000);
    }
}
