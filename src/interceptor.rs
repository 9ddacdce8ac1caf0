//! Interceptor Installer + Trap Handler.
//!
//! Installs the synchronous `SIGSYS` handler and the seccomp filter that
//! feeds it, then, on every trap, classifies the syscall and either starts
//! the fork server, aborts, or lets the syscall proceed by re-executing it
//! with the re-entry marker.

use std::os::raw::{c_int, c_void};

use crate::arch;
use crate::context::{self, HandlerContext};
use crate::error::LoadError;
use crate::{filter, forkserver, protocol};

/// Performs, in order: install the `SIGSYS` handler, set `no_new_privs`,
/// build and apply the seccomp filter. After this returns successfully,
/// every subsequent inspected syscall traps into [`handle_sigsys`].
pub fn install() -> Result<(), LoadError> {
    install_signal_handler()?;
    set_no_new_privs()?;
    let program = filter::build()?;
    filter::apply(&program)?;
    Ok(())
}

fn install_signal_handler() -> Result<(), LoadError> {
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handle_sigsys as *const () as usize;
    action.sa_flags = libc::SA_SIGINFO | libc::SA_NODEFER;
    unsafe {
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(libc::SIGSYS, &action, std::ptr::null_mut()) != 0 {
            return Err(LoadError::SignalInstall(std::io::Error::last_os_error()));
        }
    }
    Ok(())
}

fn set_no_new_privs() -> Result<(), LoadError> {
    let ret = unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) };
    if ret != 0 {
        return Err(LoadError::NoNewPrivs(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Sorts a trapped syscall number and its arguments into what the fork
/// server should do next. Kept as a free function, independent of register
/// access, so its coverage of [`filter::INSPECTED_SYSCALLS`] can be unit
/// tested without a real trap.
enum Action {
    /// Not a trigger: proceed (re-execute) without starting the server.
    Proceed,
    /// A trigger: log, then enter the fork server before proceeding.
    Trigger,
    /// A forbidden syscall: the process must not continue.
    Forbidden,
    /// Any other trapped syscall: defensive default, starts the server.
    Unclassified,
}

fn classify(sc_num: i64, args: &[i64; 5], ctx: &HandlerContext) -> Action {
    let path_arg = |slot: usize| -> *const std::os::raw::c_char { args[slot] as *const _ };
    // Stats the raw pointer directly: no CString/CStr/UTF-8 conversion, so
    // this allocates nothing and matches registered inputs whose path isn't
    // valid UTF-8 the same as any other.
    let is_input = |p: *const std::os::raw::c_char| unsafe { ctx.registry.contains_raw(p) };

    match sc_num {
        n if n == libc::SYS_open => {
            if is_input(path_arg(0)) {
                Action::Trigger
            } else {
                Action::Proceed
            }
        }
        n if n == libc::SYS_openat => {
            if is_input(path_arg(1)) {
                Action::Trigger
            } else {
                Action::Proceed
            }
        }
        n if n == libc::SYS_stat => {
            if is_input(path_arg(0)) {
                Action::Trigger
            } else {
                Action::Proceed
            }
        }
        n if n == libc::SYS_execve || n == libc::SYS_execveat => Action::Forbidden,
        n if n == libc::SYS_fork || n == libc::SYS_vfork || n == libc::SYS_clone => {
            Action::Forbidden
        }
        _ => Action::Unclassified,
    }
}

/// The synchronous `SIGSYS` handler. Runs on the host's own thread at the
/// instant a trapped syscall was about to execute.
extern "C" fn handle_sigsys(_num: c_int, _info: *mut libc::siginfo_t, ucontext: *mut c_void) {
    let ctx = ucontext as *mut libc::ucontext_t;
    let (sc_num, args) = unsafe { arch::read_syscall(ctx) };
    let handler_ctx = context::get();

    match classify(sc_num, &args, handler_ctx) {
        Action::Trigger => {
            protocol::raw_write_str(
                libc::STDERR_FILENO,
                "Intercepted syscall on a registered input, starting fork server.\n",
            );
            forkserver::run(handler_ctx);
        }
        Action::Forbidden => {
            protocol::raw_write_str(
                libc::STDERR_FILENO,
                "Process attempted execve/fork/clone; this cannot be replayed in the fork server, aborting.\n",
            );
            unsafe { libc::abort() };
        }
        Action::Unclassified => {
            forkserver::run(handler_ctx);
        }
        Action::Proceed => {}
    }

    let result = unsafe {
        libc::syscall(
            sc_num,
            args[0],
            args[1],
            args[2],
            args[3],
            args[4],
            arch::REENTRY_MARKER,
        )
    };
    unsafe { arch::write_result(ctx, result) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeout;
    use crate::registry::InputRegistry;

    fn test_ctx() -> &'static HandlerContext {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            crate::context::install(InputRegistry::new(), Timeout(1));
        });
        crate::context::get()
    }

    #[test]
    fn inspected_set_is_fully_covered_by_classifier() {
        // The classifier's default arm is reachable only by a syscall in the
        // inspected set with no specific case. With today's inspected set
        // every entry has a specific arm, so this asserts that invariant
        // directly instead of leaving it merely "unreachable in practice."
        let ctx = test_ctx();
        for &sc in filter::INSPECTED_SYSCALLS {
            let action = classify(sc, &[0; 5], ctx);
            assert!(
                !matches!(action, Action::Unclassified),
                "syscall {sc} fell through to the defensive default"
            );
        }
    }

    #[test]
    fn unknown_syscall_is_unclassified() {
        let ctx = test_ctx();
        // An arbitrary syscall number outside the inspected set would never
        // reach classify() in practice (the filter wouldn't trap it), but
        // the defensive default must still be correct if it ever did.
        assert!(matches!(
            classify(999_999, &[0; 5], ctx),
            Action::Unclassified
        ));
    }
}
