//! BSD-sockets adapters.
//!
//! Everything platform-specific about handle creation, error-code translation,
//! address structures and the non-blocking flag lives here; the platform-neutral
//! [`Socket`](crate::Socket) type only ever sees `io::Result`, `SocketAddr` and
//! the owned handle alias.

#![cfg_attr(not(unix), allow(warnings))]

mod addr;
mod c_wrappers;

pub(crate) use {addr::*, c_wrappers::*};

pub(super) mod unixprelude {
    pub use libc::{c_int, sa_family_t, socklen_t};
    pub use std::os::unix::prelude::*;
}

/// Owned OS socket handle. Closing is `close(2)` on drop.
pub(crate) type OwnedSock = std::os::fd::OwnedFd;
