use std::sync::atomic::{AtomicBool, Ordering};

/// Set by SIGINT/SIGTERM. The installer checks it between steps and the
/// executor polls it while a child runs.
pub(crate) static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
pub(crate) fn install_interrupt_handlers() {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

#[cfg(not(unix))]
pub(crate) fn install_interrupt_handlers() {}

pub(crate) fn interrupt_requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
