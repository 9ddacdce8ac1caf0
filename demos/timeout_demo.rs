//! End-to-end proof of the per-child CPU-time budget: the forked child spins
//! forever, and the parent's reply frame shows it was killed by the
//! CPU-limit signal within the configured timeout.
//!
//! Requires real Linux seccomp support. Run manually:
//!
//! ```text
//! echo hi > /tmp/forksrv-demo.in
//! __SCM_TIMEOUT=1 __SCM_INPUT_0=/tmp/forksrv-demo.in \
//!     cargo run --example timeout_demo
//! ```
//!
//! Expect, after sending one command byte, a reply frame whose body is the
//! decimal value of `SIGXCPU` (24 on Linux/x86) within about a second.

fn main() {
    let _ = forksrv_preload::protocol::MAGIC;
    let input = std::env::var("__SCM_INPUT_0").expect("set __SCM_INPUT_0 to run this demo");

    let _ = std::fs::File::open(&input).expect("failed to open registered input");

    // Resumed in a forked child with RLIMIT_CPU armed. This burns CPU time
    // until the kernel delivers SIGXCPU (or our wall-clock SIGALRM backstop
    // fires first), which the fork server's parent reports as the reply body.
    let mut x: u64 = 0;
    loop {
        x = x.wrapping_add(1).wrapping_mul(2654435761);
        std::hint::black_box(x);
    }
}
