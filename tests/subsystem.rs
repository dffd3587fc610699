//! The subsystem refcount law: initialized exactly while at least one socket
//! is open, torn down once all are closed, under any thread interleaving.
//!
//! Other tests in this process open sockets of their own, so assertions are
//! phrased as lower bounds on the shared counter rather than exact values.

use crate::tests::util::*;
use crate::{subsystem, Socket};
use color_eyre::eyre::{ensure, Context};
use std::sync::mpsc;

#[test]
fn refcount_covers_every_open_socket() -> TestResult {
    install();
    const N: usize = 8;

    let (tx, rx) = mpsc::channel::<Socket>();
    let mut workers = Vec::new();
    for _ in 0..N {
        let tx = tx.clone();
        workers.push(spawn(move || {
            let mut sock = Socket::new();
            sock.create().context("create failed")?;
            tx.send(sock).context("handoff failed")?;
            Ok(())
        }));
    }
    drop(tx);

    let held: Vec<Socket> = rx.into_iter().collect();
    for worker in workers {
        join(worker)?;
    }
    ensure_eq!(held.len(), N);
    ensure!(
        subsystem::active_count() as usize >= N,
        "counter must cover all {N} open sockets, found {}",
        subsystem::active_count()
    );
    drop(held);
    Ok(())
}

#[test]
fn repeated_init_teardown_cycles_stay_usable() -> TestResult {
    install();
    let mut workers = Vec::new();
    for _ in 0..4 {
        workers.push(spawn(|| {
            for _ in 0..25 {
                let mut sock = Socket::new();
                sock.create().context("create failed")?;
                sock.close().context("close failed")?;
            }
            Ok(())
        }));
    }
    for worker in workers {
        join(worker)?;
    }

    // However the teardown edges interleaved, the subsystem must come back
    // up for the next socket.
    let (server, client) = connected_pair()?;
    client.send(b"still alive").context("send failed")?;
    let data = server.receive().context("receive failed")?;
    ensure_eq!(data, b"still alive");
    Ok(())
}

#[test]
fn accepted_sockets_hold_their_own_reference() -> TestResult {
    install();
    let (listener, port) = loopback_listener()?;
    let client = loopback_client(port)?;
    let server = listener.accept().context("accept failed")?;

    let floor = 3; // listener + client + accepted peer
    ensure!(
        subsystem::active_count() >= floor,
        "accepted socket must contribute to the refcount"
    );
    drop((listener, client, server));
    Ok(())
}
