//! The "interrupt pending" flag shared between the SIGINT handler and the main loop.
//!
//! This is the only state touched from signal-handling context. The handler
//! only stores into an atomic word and calls `write(2)`, both of which are
//! async-signal-safe.

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

static PENDING: AtomicBool = AtomicBool::new(false);

/// Mark an interrupt as pending. Safe to call from a signal handler.
pub fn set() {
    PENDING.store(true, Ordering::SeqCst);
}

/// Return whether an interrupt was pending and clear the flag.
pub fn take_and_clear() -> bool {
    PENDING.swap(false, Ordering::SeqCst)
}

extern "C" fn on_sigint(_: libc::c_int) {
    set();
    unsafe {
        libc::write(libc::STDOUT_FILENO, b"\n".as_ptr().cast(), 1);
    }
}

/// Install the interpreter's SIGINT handler.
///
/// `SA_RESTART` is left off so a blocked read or wait returns `EINTR`; the
/// executor retries its waits.
pub fn install_handler() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe { signal::sigaction(Signal::SIGINT, &action) }?;
    Ok(())
}

/// Restore the default SIGINT and SIGPIPE dispositions. Called in every forked child.
///
/// The Rust runtime ignores SIGPIPE in the interpreter, and an ignored signal
/// stays ignored across `execve`.
pub fn reset_to_default() -> nix::Result<()> {
    for sig in [Signal::SIGINT, Signal::SIGPIPE] {
        unsafe { signal::signal(sig, SigHandler::SigDfl) }?;
    }
    Ok(())
}
