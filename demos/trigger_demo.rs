//! End-to-end proof that opening a registered input file turns this process
//! into a fork server: forks a child and observes the kernel's reaction
//! directly.
//!
//! Requires real Linux seccomp support. Not run under `cargo test` (these
//! properties can only be observed by actually tripping the filter); run
//! manually:
//!
//! ```text
//! echo hi > /tmp/forksrv-demo.in
//! __SCM_TIMEOUT=5 __SCM_INPUT_0=/tmp/forksrv-demo.in \
//!     cargo run --example trigger_demo
//! ```
//!
//! Expect, on stdout: a `## FORKSERVER -> SCM ##INIT` frame, then (after you
//! type a line and press enter) a `## FORKSERVER -> SCM ##0` frame for each
//! command byte sent.

fn main() {
    // Referencing the crate is what makes the linker pull in its object
    // file at all; forksrv_preload's #[ctor] constructor runs as a side
    // effect of that, before this main() starts, installing the registry
    // and the seccomp filter.
    let _ = forksrv_preload::protocol::MAGIC;
    println!("[host] starting up, about to touch the registered input file");

    let input = std::env::var("__SCM_INPUT_0").expect("set __SCM_INPUT_0 to run this demo");

    // This open() is the trigger: it traps into the SIGSYS handler, which
    // recognizes the path as a registered input and starts the fork server.
    // Only a forked child ever returns from here.
    let _ = std::fs::File::open(&input).expect("failed to open registered input");

    println!("[host] resumed inside a forked child, doing the host's real work now");
    println!("[host] done");
}
