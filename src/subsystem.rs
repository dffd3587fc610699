//! Process-wide socket-subsystem bookkeeping.
//!
//! Winsock requires a once-per-process handshake (`WSAStartup`/`WSACleanup`)
//! bracketing all socket usage. Rather than an ambient static whose teardown
//! order is anyone's guess, the subsystem is modeled as explicit refcounted
//! state: every open [`Socket`](crate::Socket) holds a [`SubsystemRef`], the
//! first acquisition initializes the subsystem and the last release tears it
//! down. On Unix the init/teardown edges are no-ops, but the count is
//! maintained uniformly so the invariant is observable on every platform.

use crate::os::sys;
use std::{io, sync::Mutex, sync::PoisonError};

static USAGE_COUNT: Mutex<u32> = Mutex::new(0);

/// RAII share of the process-wide socket subsystem.
///
/// Deliberately not `Clone`: each open OS handle acquires its own reference,
/// which keeps acquire/release pairing trivially balanced.
#[derive(Debug)]
pub(crate) struct SubsystemRef(());

impl SubsystemRef {
    /// Acquires a share, initializing the subsystem if this is the first one.
    ///
    /// If initialization fails, the count is left untouched and the error is
    /// returned, so a later acquisition retries from scratch.
    #[allow(clippy::panic_in_result_fn)] // refcount overflow is unrecoverable
    pub fn acquire() -> io::Result<Self> {
        let mut count = USAGE_COUNT.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            sys::init_subsystem()?;
        }
        *count = count.checked_add(1).expect("socket subsystem refcount overflow");
        Ok(Self(()))
    }
}

impl Drop for SubsystemRef {
    fn drop(&mut self) {
        let mut count = USAGE_COUNT.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            sys::teardown_subsystem();
        }
    }
}

/// Number of live subsystem references. Diagnostic accessor for tests.
#[cfg(test)]
pub(crate) fn active_count() -> u32 {
    *USAGE_COUNT.lock().unwrap_or_else(PoisonError::into_inner)
}
