use crate::tests::util::*;
use color_eyre::eyre::{ensure, Context};
use std::{thread, time::Duration};

#[test]
fn lines_reassembled_across_fragment_boundaries() -> TestResult {
    install();
    let (mut server, client) = connected_pair()?;

    let sender = spawn(move || {
        // Two whole lines and the head of a third in one write...
        client.send(b"alpha\nbeta\nga").context("first send failed")?;
        thread::sleep(Duration::from_millis(60));
        // ...the tail of the third in another.
        client.send(b"mma\n").context("second send failed")?;
        Ok(())
    });

    ensure_eq!(server.read_line()?.as_deref(), Some("alpha"));
    ensure_eq!(server.read_line()?.as_deref(), Some("beta"));
    ensure_eq!(server.read_line()?.as_deref(), Some("gamma"));
    join(sender)?;

    // Sender is gone; the stream ends with no line pending.
    ensure_eq!(server.read_line()?, None);
    ensure!(server.pending_line().is_empty(), "no leftover bytes expected");
    Ok(())
}

#[test]
fn close_mid_line_preserves_partial() -> TestResult {
    install();
    let (mut server, client) = connected_pair()?;

    client.send(b"complete\nunterminated").context("send failed")?;
    drop(client);

    ensure_eq!(server.read_line()?.as_deref(), Some("complete"));
    ensure_eq!(server.read_line()?, None);
    ensure_eq!(server.pending_line(), b"unterminated");

    // A repeated attempt neither errors nor disturbs the partial line.
    ensure_eq!(server.read_line()?, None);
    ensure_eq!(server.pending_line(), b"unterminated");
    Ok(())
}

#[test]
fn empty_lines_are_distinct() -> TestResult {
    install();
    let (mut server, client) = connected_pair()?;

    client.send(b"\n\nx\n").context("send failed")?;
    ensure_eq!(server.read_line()?.as_deref(), Some(""));
    ensure_eq!(server.read_line()?.as_deref(), Some(""));
    ensure_eq!(server.read_line()?.as_deref(), Some("x"));
    Ok(())
}
