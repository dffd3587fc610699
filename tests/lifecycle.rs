use crate::tests::util::*;
use crate::{Socket, SocketFamily, SocketType};
use color_eyre::eyre::{ensure, Context};
use std::io::ErrorKind;

#[test]
fn construction_does_not_open_a_handle() -> TestResult {
    install();
    let sock = Socket::new();
    ensure!(!sock.is_valid(), "no handle should exist before create");
    Ok(())
}

#[test]
fn create_then_close_transitions_validity() -> TestResult {
    install();
    let mut sock = Socket::new();
    sock.create().context("create failed")?;
    ensure!(sock.is_valid(), "handle should be open after create");
    sock.close().context("close failed")?;
    ensure!(!sock.is_valid(), "handle should be gone after close");
    // Closing an already-closed socket is a no-op success.
    sock.close().context("repeat close failed")?;
    Ok(())
}

#[test]
fn create_resolves_unspecified_family() -> TestResult {
    install();
    let mut sock = Socket::new();
    sock.set_family(SocketFamily::Unspec);
    sock.create().context("create failed")?;
    ensure_eq!(sock.family(), SocketFamily::Inet);
    Ok(())
}

#[test]
fn operations_on_unopened_socket_fail() -> TestResult {
    install();
    let mut sock = Socket::new();
    ensure_eq!(sock.send(b"x").unwrap_err().kind(), ErrorKind::NotConnected);
    ensure_eq!(sock.bind(0).unwrap_err().kind(), ErrorKind::NotConnected);
    ensure_eq!(sock.listen().unwrap_err().kind(), ErrorKind::NotConnected);
    ensure_eq!(sock.set_nonblocking(true).unwrap_err().kind(), ErrorKind::NotConnected);
    Ok(())
}

#[test]
fn listen_requires_stream_type() -> TestResult {
    install();
    let sock = datagram_socket()?;
    ensure_eq!(sock.socket_type(), SocketType::Datagram);
    ensure_eq!(sock.listen().unwrap_err().kind(), ErrorKind::InvalidInput);
    Ok(())
}

#[test]
fn set_hostname_failure_preserves_previous_target() -> TestResult {
    install();
    let mut sock = Socket::new();
    sock.set_hostname(LOCALHOST).context("literal hostname failed")?;
    ensure_eq!(sock.hostname(), LOCALHOST);

    // RFC 2606 reserves .invalid to never resolve.
    ensure!(
        sock.set_hostname("host.invalid").is_err(),
        "resolution of a reserved-invalid name should fail"
    );
    ensure_eq!(sock.hostname(), LOCALHOST);
    Ok(())
}

#[test]
fn family_mismatched_literal_is_rejected() -> TestResult {
    install();
    let mut sock = Socket::new();
    ensure_eq!(sock.set_hostname("::1").unwrap_err().kind(), ErrorKind::InvalidInput);
    sock.set_family(SocketFamily::Inet6);
    sock.set_hostname("::1").context("v6 literal on v6 family failed")?;
    Ok(())
}

#[test]
fn receive_minimum_cannot_exceed_buffer() -> TestResult {
    install();
    let (server, _client) = connected_pair()?;
    let mut buf = [0; 8];
    ensure_eq!(
        server.receive_into(&mut buf, 9).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    Ok(())
}

#[test]
fn reconnect_without_stored_target_fails() -> TestResult {
    install();
    let mut sock = Socket::new();
    ensure_eq!(sock.reconnect().unwrap_err().kind(), ErrorKind::InvalidInput);
    Ok(())
}

#[test]
fn take_error_is_clear_on_healthy_socket() -> TestResult {
    install();
    let (server, _client) = connected_pair()?;
    ensure!(server.take_error().context("take_error failed")?.is_none(), "unexpected pending error");
    Ok(())
}
