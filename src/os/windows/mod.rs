//! Winsock2 adapters.
//!
//! Same function surface as the Unix module, expressed over `windows-sys`.
//! The one genuinely Windows-only concern is the `WSAStartup`/`WSACleanup`
//! handshake, surfaced through `init_subsystem`/`teardown_subsystem` and
//! refcounted by [`crate::subsystem`].

#![cfg_attr(not(windows), allow(warnings))]

mod addr;
mod c_wrappers;

pub(crate) use {addr::*, c_wrappers::*};

pub(super) mod winprelude {
    pub use std::os::windows::prelude::*;
    pub use windows_sys::Win32::Networking::WinSock::SOCKET;
}

/// Owned OS socket handle. Closing is `closesocket` on drop.
pub(crate) type OwnedSock = std::os::windows::io::OwnedSocket;
