//! Termination signal handling.
//!
//! The handler only records that a signal arrived. The pipeline polls the
//! flag between stages and unwinds normally, so scratch files are removed by
//! their destructors.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the SIGINT/SIGTERM handler. Call once, from `main`.
///
/// # Errors
///
/// Returns the `ctrlc` error if a handler is already installed or the
/// platform refuses the registration.
pub fn install() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst))
}

/// The process-wide flag set by the handler.
#[must_use]
pub fn flag() -> &'static AtomicBool {
    &INTERRUPTED
}
