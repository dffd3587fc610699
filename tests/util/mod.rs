//! Test plumbing: loopback listener/client construction on ephemeral ports
//! and color-eyre result types.
#![allow(dead_code, unused_macros)]

#[macro_use]
mod eyre;
pub use eyre::*;

use crate::{Socket, SocketDomain, SocketFamily, SocketProtocol, SocketType};
use color_eyre::eyre::WrapErr;
use std::thread::{self, JoinHandle};

pub const LOCALHOST: &str = "127.0.0.1";

pub fn stream_socket() -> TestResult<Socket> {
    let mut sock = Socket::new();
    sock.create().context("stream socket creation failed")?;
    Ok(sock)
}

pub fn datagram_socket() -> TestResult<Socket> {
    let mut sock = Socket::with_config(
        SocketFamily::Inet,
        SocketDomain::Inet,
        SocketType::Datagram,
        SocketProtocol::Udp,
    );
    sock.create().context("datagram socket creation failed")?;
    Ok(sock)
}

/// Binds a listening stream socket to an OS-chosen ephemeral port and
/// reports the port it landed on.
pub fn loopback_listener() -> TestResult<(Socket, u16)> {
    let mut listener = stream_socket()?;
    listener.bind(0).context("bind to ephemeral port failed")?;
    listener.listen().context("listen failed")?;
    let port = listener.local_port().context("local port query failed")?;
    Ok((listener, port))
}

pub fn loopback_client(port: u16) -> TestResult<Socket> {
    let mut client = stream_socket()?;
    client.connect(LOCALHOST, port).context("connect failed")?;
    Ok(client)
}

/// A connected loopback stream pair: `(accepted server side, client side)`.
pub fn connected_pair() -> TestResult<(Socket, Socket)> {
    let (listener, port) = loopback_listener()?;
    let client = loopback_client(port)?;
    let server = listener.accept().context("accept failed")?;
    Ok((server, client))
}

/// Joins a test thread, flattening panics into test failures.
pub fn join(handle: JoinHandle<TestResult>) -> TestResult {
    match handle.join() {
        Ok(result) => result,
        Err(_) => color_eyre::eyre::bail!("test thread panicked"),
    }
}

pub fn spawn(f: impl (FnOnce() -> TestResult) + Send + 'static) -> JoinHandle<TestResult> {
    thread::spawn(f)
}
