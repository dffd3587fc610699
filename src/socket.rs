//! The platform-neutral socket type.
// Byte counters below are bounded by caller-supplied buffer lengths.
#![allow(clippy::arithmetic_side_effects)]

use crate::{os::sys, subsystem::SubsystemRef};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
};
use tracing::{debug, trace};

/// Address family of a socket.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SocketFamily {
    /// No family picked yet. Resolves to [`Inet`](Self::Inet) when the OS
    /// handle is created.
    Unspec,
    /// IPv4.
    #[default]
    Inet,
    /// IPv6.
    Inet6,
}

/// Communications domain of a socket, selecting the protocol family for the
/// OS handle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SocketDomain {
    /// Unix-domain (local) sockets. Only meaningful on POSIX-like targets;
    /// `create` reports [`Unsupported`](io::ErrorKind::Unsupported) on
    /// Windows.
    Unix,
    /// Internet sockets.
    #[default]
    Inet,
}

/// Base type of a socket.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SocketType {
    /// Connection-oriented ordered byte stream with no message boundaries.
    #[default]
    Stream,
    /// Connectionless discrete messages.
    Datagram,
}

/// Concrete transport protocol of a socket.
///
/// By convention [`Stream`](SocketType::Stream) pairs with `Tcp` and
/// [`Datagram`](SocketType::Datagram) with `Udp`; the pairing is the
/// caller's responsibility and is not validated here.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SocketProtocol {
    /// TCP.
    #[default]
    Tcp,
    /// UDP.
    Udp,
}

/// Pending-connection queue depth for `listen`. Sized for a single-client
/// use case, not a general-purpose server.
const LISTEN_BACKLOG: i32 = 1;
/// Receive chunk size for the growable-output receive paths and `read_line`.
/// One Ethernet MTU's worth.
const RECV_CHUNK: usize = 1500;

const NOT_OPEN_MSG: &str = "socket handle is not open";
const NO_TARGET_MSG: &str = "no target address stored";

/// A synchronous socket owning exactly one OS handle.
///
/// One `Socket` is meant to be driven by one thread; there is no internal
/// synchronization. Construction never touches the OS; a handle only
/// exists between a successful [`create`](Self::create) and the matching
/// [`close`](Self::close) (or drop, which closes implicitly).
///
/// Server role: `create` → [`bind`](Self::bind) → [`listen`](Self::listen) →
/// [`accept`](Self::accept). Client role: `create` →
/// [`connect`](Self::connect), with [`reconnect`](Self::reconnect) redialing
/// the stored target. Data moves through [`send`](Self::send) /
/// [`receive_into`](Self::receive_into) and friends, all of which retry
/// partial transfers internally.
#[derive(Debug)]
pub struct Socket {
    // Declaration order matters: the handle must be released before the
    // subsystem reference is.
    handle: Option<sys::OwnedSock>,
    subsystem: Option<SubsystemRef>,
    family: SocketFamily,
    domain: SocketDomain,
    ty: SocketType,
    protocol: SocketProtocol,
    target: Option<IpAddr>,
    hostname: String,
    port: u16,
    line_buf: Vec<u8>,
}

impl Socket {
    /// Creates an unopened socket with the platform defaults:
    /// IPv4, internet domain, stream type, TCP.
    pub fn new() -> Self {
        Self::with_config(
            SocketFamily::default(),
            SocketDomain::default(),
            SocketType::default(),
            SocketProtocol::default(),
        )
    }

    /// Creates an unopened socket with explicit configuration, to be applied
    /// when [`create`](Self::create) runs.
    pub fn with_config(
        family: SocketFamily,
        domain: SocketDomain,
        ty: SocketType,
        protocol: SocketProtocol,
    ) -> Self {
        Self {
            handle: None,
            subsystem: None,
            family,
            domain,
            ty,
            protocol,
            target: None,
            hostname: String::new(),
            port: 0,
            line_buf: Vec::new(),
        }
    }

    /// Sets the address family. Takes effect on the next `create`; calling
    /// this on an open socket and expecting the OS handle to change is a
    /// caller error.
    pub fn set_family(&mut self, family: SocketFamily) {
        self.family = family;
    }
    /// Sets the communications domain. Takes effect on the next `create`.
    pub fn set_domain(&mut self, domain: SocketDomain) {
        self.domain = domain;
    }
    /// Sets the socket type. Takes effect on the next `create`.
    pub fn set_type(&mut self, ty: SocketType) {
        self.ty = ty;
    }
    /// Sets the transport protocol. Takes effect on the next `create`.
    pub fn set_protocol(&mut self, protocol: SocketProtocol) {
        self.protocol = protocol;
    }
    /// Sets the port used by subsequent addressing operations.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    /// Resolves `host` and stores it as the active target address. Accepts
    /// both numeric address literals and resolvable names.
    ///
    /// On resolution failure the previously stored target, if any, is left
    /// untouched.
    pub fn set_hostname(&mut self, host: &str) -> io::Result<()> {
        let ip = self.resolve_host(host)?;
        self.hostname.clear();
        self.hostname.push_str(host);
        self.target = Some(ip);
        Ok(())
    }

    /// The last host string passed to [`set_hostname`](Self::set_hostname) or
    /// [`connect`](Self::connect), or the peer address for accepted sockets.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
    /// The stored port, in host byte order.
    pub fn port(&self) -> u16 {
        self.port
    }
    /// The configured address family.
    pub fn family(&self) -> SocketFamily {
        self.family
    }
    /// The configured communications domain.
    pub fn domain(&self) -> SocketDomain {
        self.domain
    }
    /// The configured socket type.
    pub fn socket_type(&self) -> SocketType {
        self.ty
    }
    /// The configured transport protocol.
    pub fn protocol(&self) -> SocketProtocol {
        self.protocol
    }

    /// Whether the OS handle is currently open, independent of connection
    /// state.
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Requests an OS handle for the stored family/domain/type/protocol,
    /// closing any previously open handle first. An unspecified family
    /// resolves to IPv4 at this point.
    ///
    /// On platforms with a global socket subsystem this also performs the
    /// process-wide initialization, refcounted across all live sockets.
    pub fn create(&mut self) -> io::Result<()> {
        self.close()?;
        if self.family == SocketFamily::Unspec {
            self.family = SocketFamily::Inet;
        }
        let subsystem = SubsystemRef::acquire()?;
        let handle = sys::create(self.family, self.domain, self.ty, self.protocol)?;
        trace!(family = ?self.family, ty = ?self.ty, protocol = ?self.protocol, "socket handle created");
        self.handle = Some(handle);
        self.subsystem = Some(subsystem);
        Ok(())
    }

    /// Releases the OS handle if open and drops this socket's share of the
    /// process-wide subsystem, tearing it down if this was the last share.
    /// Closing an already-closed socket is a no-op success.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(handle) = self.handle.take() {
            trace!("socket handle closed");
            drop(handle);
        }
        self.subsystem = None;
        self.line_buf.clear();
        Ok(())
    }

    /// Binds the open handle to the given local port on the wildcard address
    /// of the configured family.
    pub fn bind(&mut self, port: u16) -> io::Result<()> {
        self.port = port;
        let address = SocketAddr::new(self.wildcard_ip(), port);
        sys::bind(self.handle()?, address).map_err(|e| self.log_fail("bind", e))
    }

    /// Marks a bound stream socket as passive with a single-connection
    /// backlog.
    pub fn listen(&self) -> io::Result<()> {
        if self.ty != SocketType::Stream {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "listen requires a stream socket",
            ));
        }
        sys::listen(self.handle()?, LISTEN_BACKLOG).map_err(|e| self.log_fail("listen", e))
    }

    /// Waits for an incoming connection (unless the listening socket is
    /// non-blocking) and returns a new open, connected socket for that peer.
    /// The listening socket keeps listening.
    pub fn accept(&self) -> io::Result<Socket> {
        let listener = self.handle()?;
        let subsystem = SubsystemRef::acquire()?;
        let (peer, peer_addr) = sys::accept(listener).map_err(|e| self.log_fail("accept", e))?;
        let mut conn = Socket::with_config(self.family, self.domain, self.ty, self.protocol);
        if let Some(address) = peer_addr {
            conn.hostname = address.ip().to_string();
            conn.port = address.port();
            conn.target = Some(address.ip());
        }
        trace!(peer = %conn.hostname, "accepted connection");
        conn.handle = Some(peer);
        conn.subsystem = Some(subsystem);
        Ok(conn)
    }

    /// Resolves `host`, stores it together with `port` as the target
    /// address, and attempts an OS-level connect on the open handle.
    ///
    /// For stream sockets this blocks until the handshake completes or fails
    /// (or returns immediately with the platform's in-progress error in
    /// non-blocking mode; interrogate completion with
    /// [`take_error`](Self::take_error)). For datagram sockets it only fixes
    /// the default destination. The handle's open/closed state is preserved
    /// on failure; the target stays stored once resolution has succeeded, so
    /// a retry or [`reconnect`](Self::reconnect) needs no re-supplied
    /// parameters.
    pub fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        let ip = self.resolve_host(host)?;
        self.hostname.clear();
        self.hostname.push_str(host);
        self.port = port;
        self.target = Some(ip);
        sys::connect(self.handle()?, SocketAddr::new(ip, port)).map_err(|e| {
            debug!(host, port, error = %e, "connect failed");
            e
        })
    }

    /// Re-establishes a client connection to the previously stored hostname
    /// and port. A stream handle cannot be connected twice, so any open
    /// handle is closed and a fresh one created before dialing.
    ///
    /// Fails if no prior target is stored.
    pub fn reconnect(&mut self) -> io::Result<()> {
        if self.hostname.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, NO_TARGET_MSG));
        }
        self.create()?;
        let (host, port) = (self.hostname.clone(), self.port);
        self.connect(&host, port)
    }

    /// Transmits the whole of `data` over a connected stream socket,
    /// retrying partial transmissions until every byte is out. Returns the
    /// number of bytes sent, which on success equals `data.len()`.
    ///
    /// A short transmission followed by an error reports the error rather
    /// than silently truncating; the same applies to a would-block condition
    /// in non-blocking mode.
    pub fn send(&self, data: &[u8]) -> io::Result<usize> {
        let sock = self.handle()?;
        let mut sent = 0;
        while sent < data.len() {
            match sys::send(sock, &data[sent..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => sent += n,
                Err(e) => return Err(self.log_fail("send", e)),
            }
        }
        Ok(sent)
    }

    /// Datagram-oriented send to the stored target address.
    ///
    /// With `send_complete` set, retries like [`send`](Self::send) until the
    /// whole buffer has been handed to the OS. This is a compatibility shim for
    /// callers reusing one code path for stream and datagram transmission,
    /// not a promise that datagrams get fragmented or reassembled. Without
    /// it, a single transmission attempt is made and its (possibly partial)
    /// byte count returned.
    pub fn send_to(&self, data: &[u8], send_complete: bool) -> io::Result<usize> {
        let sock = self.handle()?;
        let target = self.target_addr()?;
        if !send_complete {
            return sys::send_to(sock, data, target).map_err(|e| self.log_fail("sendto", e));
        }
        let mut sent = 0;
        while sent < data.len() {
            match sys::send_to(sock, &data[sent..], target) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => sent += n,
                Err(e) => return Err(self.log_fail("sendto", e)),
            }
        }
        Ok(sent)
    }

    /// Receives at least `min_packet_size` bytes into `buf`, retrying short
    /// receives until the minimum is met, the buffer is full, the peer
    /// closes or an error occurs. Returns the total byte count; a clean peer
    /// close before the minimum yields whatever was accumulated (zero
    /// included), not an error.
    pub fn receive_into(&self, buf: &mut [u8], min_packet_size: usize) -> io::Result<usize> {
        if min_packet_size > buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "minimum packet size exceeds the buffer size",
            ));
        }
        let sock = self.handle()?;
        let mut total = 0;
        while total < min_packet_size {
            match sys::recv(sock, &mut buf[total..]) {
                Ok(0) => break, // peer closed
                Ok(n) => total += n,
                Err(e) => return Err(self.log_fail("receive", e)),
            }
        }
        Ok(total)
    }

    /// Like [`receive_into`](Self::receive_into), accumulating into a
    /// growable buffer in MTU-sized reads.
    pub fn receive_at_least(&self, min_packet_size: usize) -> io::Result<Vec<u8>> {
        let sock = self.handle()?;
        let mut out = Vec::new();
        let mut chunk = [0; RECV_CHUNK];
        while out.len() < min_packet_size {
            match sys::recv(sock, &mut chunk) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) => return Err(self.log_fail("receive", e)),
            }
        }
        Ok(out)
    }

    /// Receives whatever a single non-empty receipt yields (minimum one
    /// byte). An empty result means the peer closed cleanly.
    pub fn receive(&self) -> io::Result<Vec<u8>> {
        self.receive_at_least(1)
    }

    /// Single-datagram receive: one underlying call, no retry loop. Returns
    /// the byte count and, when the OS reports it, the sender's address.
    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)> {
        sys::recv_from(self.handle()?, buf).map_err(|e| self.log_fail("recvfrom", e))
    }

    /// Returns one newline-terminated line from the stream with the
    /// terminator stripped, buffering bytes read past the line boundary so
    /// that the next call continues exactly where this one left off: no
    /// byte is ever dropped or duplicated across calls, whichever way the
    /// underlying reads happen to fragment.
    ///
    /// `Ok(None)` means the peer closed before a complete line arrived; any
    /// partial line stays buffered and can be inspected through
    /// [`pending_line`](Self::pending_line). Errors likewise leave the
    /// partial line in place. Non-UTF-8 bytes are replaced, not dropped.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.line_buf.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.line_buf.drain(..=pos).collect();
                line.pop(); // the newline itself
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            let mut chunk = [0; RECV_CHUNK];
            let n = match sys::recv(self.handle()?, &mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => n,
                Err(e) => return Err(self.log_fail("readline", e)),
            };
            self.line_buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Bytes of an incomplete line left behind by
    /// [`read_line`](Self::read_line) after a close or error.
    pub fn pending_line(&self) -> &[u8] {
        &self.line_buf
    }

    /// Toggles the OS non-blocking flag on the open handle. Idempotent, and
    /// safe to call both before and after `connect`/`bind`.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        sys::set_nonblocking(self.handle()?, nonblocking)
    }

    /// The local port the open handle is bound to. This is how the
    /// OS-chosen port is learned after binding to port 0.
    pub fn local_port(&self) -> io::Result<u16> {
        sys::local_addr(self.handle()?).map(|a| a.port())
    }

    /// Retrieves and clears the pending OS-level socket error (`SO_ERROR`),
    /// which is also how the outcome of a non-blocking `connect` is
    /// interrogated.
    pub fn take_error(&self) -> io::Result<Option<io::Error>> {
        sys::take_error(self.handle()?)
    }

    fn handle(&self) -> io::Result<&sys::OwnedSock> {
        self.handle
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, NOT_OPEN_MSG))
    }

    fn target_addr(&self) -> io::Result<SocketAddr> {
        let ip = self
            .target
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, NO_TARGET_MSG))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    fn wildcard_ip(&self) -> IpAddr {
        match self.family {
            SocketFamily::Inet6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }

    fn resolve_host(&self, host: &str) -> io::Result<IpAddr> {
        // Numeric literals skip the resolver, like inet_pton before
        // getaddrinfo.
        if let Ok(ip) = host.parse::<IpAddr>() {
            let family_ok = match self.family {
                SocketFamily::Unspec => true,
                SocketFamily::Inet => ip.is_ipv4(),
                SocketFamily::Inet6 => ip.is_ipv6(),
            };
            if !family_ok {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "address literal does not match the configured family",
                ));
            }
            return Ok(ip);
        }
        sys::resolve(host, self.family)
    }

    fn log_fail(&self, op: &str, e: io::Error) -> io::Error {
        if e.kind() != io::ErrorKind::WouldBlock {
            debug!(op, error = %e, "socket operation failed");
        }
        e
    }
}

impl Default for Socket {
    fn default() -> Self {
        Self::new()
    }
}
