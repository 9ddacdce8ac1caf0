//! Input Registry — resolves paths to a stable `(device, inode)` identity
//! and answers "is this syscall's path one of our registered inputs?"
//!
//! Pathnames are never compared directly: a registered input reached via a
//! symlink, a relative path, or a hardlink must still match, so the registry
//! keys on the filesystem identity a `stat` returns instead.

use std::os::raw::c_char;
use std::path::Path;

use crate::arch::REENTRY_MARKER;
use crate::error::LoadError;

pub const MAX_INPUTS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileId {
    pub dev: u64,
    pub ino: u64,
}

#[derive(Debug, Default)]
pub struct InputRegistry {
    ids: Vec<FileId>,
}

impl InputRegistry {
    pub fn new() -> Self {
        Self {
            ids: Vec::with_capacity(MAX_INPUTS),
        }
    }

    /// Resolves `path` and stores its identity. A failure here is always
    /// fatal: an input that cannot be resolved at load time can never be
    /// recognized later, which would silently defeat the whole module.
    pub fn register(&mut self, path: &Path) -> Result<(), LoadError> {
        let id = stat_bypassing_filter(path)?;
        self.ids.push(id);
        Ok(())
    }

    /// Resolves `path` and checks it against every registered identity.
    /// Unlike `register`, failure to resolve is not an error: it just means
    /// the path cannot be one of our inputs (e.g. it doesn't exist, or isn't
    /// a real file at all), so `open`/`openat`/`stat` on it is ordinary
    /// traffic we don't care about.
    pub fn contains(&self, path: &Path) -> bool {
        match stat_bypassing_filter(path) {
            Ok(id) => self.ids.contains(&id),
            Err(_) => false,
        }
    }

    /// Same check as [`contains`](Self::contains), but for a raw,
    /// NUL-terminated path pointer taken straight from a trapped syscall's
    /// argument register. Does no allocation and no UTF-8 conversion: the
    /// pointer is handed to `stat` exactly as the host gave it, so this is
    /// safe to call from the `SIGSYS` handler and correct for paths that
    /// aren't valid UTF-8.
    ///
    /// # Safety
    /// `path` must be null or point to a valid, NUL-terminated C string for
    /// the duration of this call.
    pub unsafe fn contains_raw(&self, path: *const c_char) -> bool {
        match stat_ptr_bypassing_filter(path) {
            Some(id) => self.ids.contains(&id),
            None => false,
        }
    }
}

/// Issues `stat` directly via `syscall(2)` with the re-entry marker in the
/// sixth argument slot, so this bypasses the seccomp filter whether or not
/// it has been installed yet (at constructor time it hasn't; inside the trap
/// handler it has, and this is how the handler reaches past its own filter).
///
/// Allocates a `CString` to get a NUL-terminated pointer, so this is only for
/// callers outside signal context (load-time registration). The trap handler
/// uses [`stat_ptr_bypassing_filter`] directly on the register's raw pointer.
fn stat_bypassing_filter(path: &Path) -> Result<FileId, LoadError> {
    let c_path =
        std::ffi::CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| {
            LoadError::StatFailed {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains NUL"),
            }
        })?;
    unsafe { stat_ptr_bypassing_filter(c_path.as_ptr()) }.ok_or_else(|| LoadError::StatFailed {
        path: path.to_path_buf(),
        source: std::io::Error::last_os_error(),
    })
}

/// Same `stat` bypass as [`stat_bypassing_filter`], but takes the raw C
/// string pointer directly with no intermediate allocation or copy — the
/// only path that may run from inside the `SIGSYS` handler.
///
/// # Safety
/// `path` must be null or point to a valid, NUL-terminated C string for the
/// duration of this call.
unsafe fn stat_ptr_bypassing_filter(path: *const c_char) -> Option<FileId> {
    if path.is_null() {
        return None;
    }
    let mut statbuf: libc::stat = std::mem::zeroed();
    let ret = libc::syscall(
        libc::SYS_stat,
        path,
        &mut statbuf as *mut libc::stat,
        0,
        0,
        0,
        REENTRY_MARKER,
    );
    if ret == 0 {
        Some(FileId {
            dev: statbuf.st_dev as u64,
            ino: statbuf.st_ino as u64,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn identity_matches_across_hardlinks() {
        let dir = std::env::temp_dir().join(format!("forksrv-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.in");
        let b = dir.join("b.in");
        let _ = std::fs::remove_file(&a);
        let _ = std::fs::remove_file(&b);
        std::fs::File::create(&a).unwrap().write_all(b"x").unwrap();
        std::fs::hard_link(&a, &b).unwrap();

        let mut registry = InputRegistry::new();
        registry.register(&a).unwrap();
        assert!(registry.contains(&b));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn distinct_files_do_not_match() {
        let dir = std::env::temp_dir().join(format!("forksrv-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.in");
        let b = dir.join("b.in");
        std::fs::File::create(&a).unwrap().write_all(b"x").unwrap();
        std::fs::File::create(&b).unwrap().write_all(b"y").unwrap();

        let mut registry = InputRegistry::new();
        registry.register(&a).unwrap();
        assert!(!registry.contains(&b));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unresolvable_path_is_not_contained() {
        let registry = InputRegistry::new();
        assert!(!registry.contains(Path::new("/nonexistent/path/for/forksrv/test")));
    }

    #[test]
    fn non_utf8_path_still_matches_by_raw_pointer() {
        use std::os::unix::ffi::OsStrExt;

        let dir = std::env::temp_dir().join(format!("forksrv-test3-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let name = std::ffi::OsStr::from_bytes(b"not-\xffutf8.in");
        let path = dir.join(name);
        std::fs::File::create(&path).unwrap().write_all(b"x").unwrap();

        let mut registry = InputRegistry::new();
        registry.register(&path).unwrap();

        let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).unwrap();
        assert!(unsafe { registry.contains_raw(c_path.as_ptr()) });

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
