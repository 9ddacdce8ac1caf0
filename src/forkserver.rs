//! Fork Server — the supervisory loop that replaces the host's single run
//! with "fork once per command, report the child's exit status."
//!
//! Everything in here runs either inside the `SIGSYS` handler (the first
//! call, from the thread the host was already running on) or, after the
//! first fork, in the parent branch of every subsequent command. Only the
//! child branch ever returns control to the host's own code; the parent
//! never does.

use crate::config::Timeout;
use crate::context::HandlerContext;
use crate::protocol;

extern "C" fn sigalrm_abort(_signum: std::os::raw::c_int) {
    unsafe { libc::abort() };
}

/// Runs the fork server. On first entry this blocks the calling thread
/// forever in the command loop *except* in a freshly forked child, which
/// this function returns out of so the host can resume at the trapping
/// instruction. Re-entry (a second trigger syscall in the same process) is a
/// no-op: `ctx.mark_started()` only succeeds once.
pub fn run(ctx: &HandlerContext) {
    if !ctx.mark_started() {
        return;
    }

    protocol::raw_write_str(libc::STDERR_FILENO, "Initializing fork server...\n");
    protocol::write_init();

    loop {
        let mut byte: u8 = 0;
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                &mut byte as *mut u8 as *mut _,
                1,
            )
        };
        if n != 1 {
            // EOF or a read error means the controller (or the pipe to it)
            // is gone; there is nothing left to serve.
            unsafe { libc::abort() };
        }

        let pid = unsafe {
            libc::syscall(
                libc::SYS_fork,
                0,
                0,
                0,
                0,
                0,
                crate::arch::REENTRY_MARKER,
            )
        };

        if pid == 0 {
            arm_child_limits(ctx.timeout);
            return;
        }

        if pid < 0 {
            unsafe { libc::abort() };
        }

        let exit_code = wait_for_child(pid as libc::pid_t);
        protocol::write_exit_code(exit_code);
    }
}

/// Sets the per-child CPU-time budget and a matching wall-clock backstop.
/// Either firing terminates the child with a signal, which the parent then
/// reports as an ordinary exit-code frame.
fn arm_child_limits(timeout: Timeout) {
    let rlim = libc::rlimit {
        rlim_cur: timeout.0,
        rlim_max: timeout.0,
    };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_CPU, &rlim) };
    if ret != 0 {
        unsafe { libc::abort() };
    }

    unsafe {
        libc::signal(libc::SIGALRM, sigalrm_abort as *const () as libc::sighandler_t);
        libc::alarm(timeout.0 as u32);
    }
}

fn wait_for_child(pid: libc::pid_t) -> u32 {
    let mut status: i32 = 0;
    let ret = unsafe { libc::waitpid(pid, &mut status, 0) };
    if ret < 0 {
        unsafe { libc::abort() };
    }
    if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status) as u32
    } else if libc::WIFSIGNALED(status) {
        libc::WTERMSIG(status) as u32
    } else {
        unsafe { libc::abort() };
    }
}
