use crate::tests::util::*;
use color_eyre::eyre::{ensure, Context};

#[test]
fn datagram_send_to_and_recv_from() -> TestResult {
    install();
    let mut receiver = datagram_socket()?;
    receiver.bind(0).context("receiver bind failed")?;
    let port = receiver.local_port().context("receiver port query failed")?;

    let mut sender = datagram_socket()?;
    sender.set_hostname(LOCALHOST).context("set_hostname failed")?;
    sender.set_port(port);
    let sent = sender.send_to(b"one datagram", false).context("send_to failed")?;
    ensure_eq!(sent, b"one datagram".len());

    let mut buf = [0; 64];
    let (received, from) = receiver.recv_from(&mut buf).context("recv_from failed")?;
    ensure_eq!(&buf[..received], &b"one datagram"[..]);
    let from = from.ok_or_else(|| color_eyre::eyre::eyre!("sender address not reported"))?;
    ensure!(from.ip().is_loopback(), "unexpected sender address {from}");
    Ok(())
}

#[test]
fn datagram_send_complete_flag() -> TestResult {
    install();
    let mut receiver = datagram_socket()?;
    receiver.bind(0).context("receiver bind failed")?;
    let port = receiver.local_port().context("receiver port query failed")?;

    let mut sender = datagram_socket()?;
    sender.set_hostname(LOCALHOST).context("set_hostname failed")?;
    sender.set_port(port);

    let payload = [7u8; 512];
    let sent = sender.send_to(&payload, true).context("complete send_to failed")?;
    ensure_eq!(sent, payload.len());

    let mut buf = [0; 1024];
    let (received, _) = receiver.recv_from(&mut buf).context("recv_from failed")?;
    ensure_eq!(received, payload.len());
    ensure_eq!(&buf[..received], &payload[..]);
    Ok(())
}

#[test]
fn connected_datagram_fixes_default_destination() -> TestResult {
    install();
    let mut receiver = datagram_socket()?;
    receiver.bind(0).context("receiver bind failed")?;
    let port = receiver.local_port().context("receiver port query failed")?;

    let mut sender = datagram_socket()?;
    sender.connect(LOCALHOST, port).context("datagram connect failed")?;
    sender.send(b"via default destination").context("send failed")?;

    let data = receiver.receive().context("receive failed")?;
    ensure_eq!(data, b"via default destination");
    Ok(())
}

#[test]
fn send_to_without_target_fails() -> TestResult {
    install();
    let sender = datagram_socket()?;
    ensure!(
        sender.send_to(b"nowhere to go", false).is_err(),
        "send_to with no stored target should fail"
    );
    Ok(())
}
