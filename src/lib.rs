#![doc = include_str!("../README.md")]
// If this was in Cargo.toml, it would cover examples as well
#![warn(
    missing_docs,
    clippy::panic_in_result_fn,
    clippy::missing_assert_message,
    clippy::arithmetic_side_effects
)]

#[macro_use]
mod macros;

mod socket;
mod subsystem;

pub use socket::*;

pub(crate) mod os {
    #[cfg(unix)]
    pub(crate) mod unix;
    #[cfg(windows)]
    pub(crate) mod windows;

    #[cfg(unix)]
    pub(crate) use unix as sys;
    #[cfg(windows)]
    pub(crate) use windows as sys;
}

#[cfg(test)]
#[path = "../tests/index.rs"]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests;
