//! Per-architecture mapping from syscall number / argument slots to the
//! machine registers a `SIGSYS` trap's `ucontext_t` exposes them through.
//!
//! The mapping is fixed at build time: each inspected syscall's registers
//! live in different `gregs` slots depending on the calling convention, and
//! getting this wrong silently reads garbage instead of failing loudly. We'd
//! rather refuse to compile on an architecture we have not audited than
//! guess. Restricted to x86_64 for now: `seccompiler`'s BPF backend only
//! targets x86_64 and aarch64 (no 32-bit x86), so a register mapping for
//! `x86` would build a filter that can never actually apply.

#[cfg(target_arch = "x86_64")]
mod regs {
    pub const SC_NUM: usize = libc::REG_RAX as usize;
    pub const ARG: [usize; 5] = [
        libc::REG_RDI as usize,
        libc::REG_RSI as usize,
        libc::REG_RDX as usize,
        libc::REG_R10 as usize,
        libc::REG_R8 as usize,
    ];
    pub const ARG6: usize = libc::REG_R9 as usize;
    pub const RET: usize = libc::REG_RAX as usize;
}

#[cfg(not(target_arch = "x86_64"))]
compile_error!(
    "forksrv-preload only has an audited register mapping for x86_64, the only \
     architecture its seccomp-BPF backend (seccompiler) can target besides aarch64; \
     porting to another architecture requires adding and auditing a mapping in src/arch.rs"
);

#[cfg(not(target_os = "linux"))]
compile_error!("forksrv-preload relies on Linux seccomp and is not portable to other kernels");

pub use regs::{ARG, ARG6, RET, SC_NUM};

/// Sentinel placed in the sixth syscall argument when the handler re-executes
/// a syscall itself, so the installed filter lets it straight through instead
/// of trapping again. Only syscalls with at most five meaningful arguments may
/// be inspected, since this slot is where the real sixth argument would go.
pub const REENTRY_MARKER: i64 = 0x1234_5678;

/// Reads the raw register values out of a trapping `ucontext_t`.
///
/// # Safety
/// `ctx` must point to a valid `ucontext_t` as delivered by the kernel to a
/// `SA_SIGINFO` signal handler for the trap this module installs.
#[allow(clippy::unnecessary_cast)]
pub unsafe fn read_syscall(ctx: *mut libc::ucontext_t) -> (i64, [i64; 5]) {
    let gregs = &(*ctx).uc_mcontext.gregs;
    let nr = gregs[SC_NUM] as i64;
    let mut args = [0i64; 5];
    for (slot, reg) in args.iter_mut().zip(ARG.iter()) {
        *slot = gregs[*reg] as i64;
    }
    (nr, args)
}

/// Writes a syscall's result into the trapping context's return register, so
/// that when the handler returns, the host sees the syscall as having
/// completed normally with this value.
///
/// # Safety
/// Same preconditions as [`read_syscall`].
pub unsafe fn write_result(ctx: *mut libc::ucontext_t, value: i64) {
    (*ctx).uc_mcontext.gregs[RET] = value as libc::greg_t;
}
