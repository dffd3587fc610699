use super::{addr, unixprelude::*, OwnedSock};
use crate::{SocketDomain, SocketFamily, SocketProtocol, SocketType};
use libc::{sockaddr, sockaddr_storage};
use std::{
    ffi::{CStr, CString},
    io,
    mem::{size_of, zeroed},
    net::{IpAddr, SocketAddr},
    ptr,
};

pub(crate) fn init_subsystem() -> io::Result<()> {
    // BSD sockets need no global handshake.
    Ok(())
}
pub(crate) fn teardown_subsystem() {}

fn family_raw(family: SocketFamily) -> c_int {
    match family {
        SocketFamily::Unspec => libc::AF_UNSPEC,
        SocketFamily::Inet => libc::AF_INET,
        SocketFamily::Inet6 => libc::AF_INET6,
    }
}

fn type_raw(ty: SocketType) -> c_int {
    match ty {
        SocketType::Stream => libc::SOCK_STREAM,
        SocketType::Datagram => libc::SOCK_DGRAM,
    }
}

fn protocol_raw(protocol: SocketProtocol) -> c_int {
    match protocol {
        SocketProtocol::Tcp => libc::IPPROTO_TCP,
        SocketProtocol::Udp => libc::IPPROTO_UDP,
    }
}

#[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "tvos", target_os = "watchos")))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "tvos", target_os = "watchos"))]
const SEND_FLAGS: c_int = 0;

pub(crate) fn create(
    family: SocketFamily,
    domain: SocketDomain,
    ty: SocketType,
    protocol: SocketProtocol,
) -> io::Result<OwnedSock> {
    let (af, proto) = match domain {
        SocketDomain::Unix => (libc::AF_UNIX, 0),
        SocketDomain::Inet => (family_raw(family), protocol_raw(protocol)),
    };
    #[allow(unused_mut, clippy::let_and_return)]
    let ty = {
        let mut ty = type_raw(ty);
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            ty |= libc::SOCK_CLOEXEC;
        }
        ty
    };
    let (success, fd) = unsafe {
        let result = libc::socket(af, ty, proto);
        (result != -1, result)
    };
    let sock = ok_or_ret_errno!(success => unsafe {
        // SAFETY: we just created this descriptor
        OwnedSock::from_raw_fd(fd)
    })?;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    set_cloexec(&sock)?;
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "tvos", target_os = "watchos"))]
    setsockopt_int(&sock, libc::SOL_SOCKET, libc::SO_NOSIGPIPE, 1)?;
    Ok(sock)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn set_cloexec(sock: &OwnedSock) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(sock.as_raw_fd(), libc::F_GETFD, 0) };
    ok_or_ret_errno!(flags != -1 => ())?;
    let success = unsafe { libc::fcntl(sock.as_raw_fd(), libc::F_SETFD, flags | libc::FD_CLOEXEC) != -1 };
    ok_or_ret_errno!(success => ())
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "tvos", target_os = "watchos"))]
fn setsockopt_int(sock: &OwnedSock, level: c_int, name: c_int, val: c_int) -> io::Result<()> {
    let success = unsafe {
        libc::setsockopt(
            sock.as_raw_fd(),
            level,
            name,
            (&val as *const c_int).cast(),
            size_of::<c_int>() as socklen_t,
        ) != -1
    };
    ok_or_ret_errno!(success => ())
}

pub(crate) fn bind(sock: &OwnedSock, address: SocketAddr) -> io::Result<()> {
    let (saddr, len) = addr::to_sockaddr(address);
    let success = unsafe {
        libc::bind(sock.as_raw_fd(), (&saddr as *const sockaddr_storage).cast(), len) != -1
    };
    ok_or_ret_errno!(success => ())
}

pub(crate) fn listen(sock: &OwnedSock, backlog: c_int) -> io::Result<()> {
    let success = unsafe { libc::listen(sock.as_raw_fd(), backlog) != -1 };
    ok_or_ret_errno!(success => ())
}

pub(crate) fn accept(sock: &OwnedSock) -> io::Result<(OwnedSock, Option<SocketAddr>)> {
    let mut storage = unsafe { zeroed::<sockaddr_storage>() };
    let mut len = size_of::<sockaddr_storage>() as socklen_t;
    let saddr = (&mut storage as *mut sockaddr_storage).cast::<sockaddr>();
    let (success, fd) = unsafe {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        let result = libc::accept4(sock.as_raw_fd(), saddr, &mut len, libc::SOCK_CLOEXEC);
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        let result = libc::accept(sock.as_raw_fd(), saddr, &mut len);
        (result != -1, result)
    };
    let peer = ok_or_ret_errno!(success => unsafe {
        // SAFETY: freshly accepted descriptor, exclusively ours
        OwnedSock::from_raw_fd(fd)
    })?;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    set_cloexec(&peer)?;
    let address = unsafe { addr::from_sockaddr(saddr, len) };
    Ok((peer, address))
}

pub(crate) fn connect(sock: &OwnedSock, address: SocketAddr) -> io::Result<()> {
    let (saddr, len) = addr::to_sockaddr(address);
    let success = unsafe {
        libc::connect(sock.as_raw_fd(), (&saddr as *const sockaddr_storage).cast(), len) != -1
    };
    ok_or_ret_errno!(success => ())
}

pub(crate) fn send(sock: &OwnedSock, buf: &[u8]) -> io::Result<usize> {
    let (success, bytes_sent) = unsafe {
        let size_or_err =
            libc::send(sock.as_raw_fd(), buf.as_ptr().cast(), buf.len(), SEND_FLAGS);
        (size_or_err >= 0, size_or_err as usize)
    };
    ok_or_ret_errno!(success => bytes_sent)
}

pub(crate) fn recv(sock: &OwnedSock, buf: &mut [u8]) -> io::Result<usize> {
    let (success, bytes_read) = unsafe {
        let size_or_err =
            libc::recv(sock.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len(), 0);
        (size_or_err >= 0, size_or_err as usize)
    };
    ok_or_ret_errno!(success => bytes_read)
}

pub(crate) fn send_to(sock: &OwnedSock, buf: &[u8], address: SocketAddr) -> io::Result<usize> {
    let (saddr, len) = addr::to_sockaddr(address);
    let (success, bytes_sent) = unsafe {
        let size_or_err = libc::sendto(
            sock.as_raw_fd(),
            buf.as_ptr().cast(),
            buf.len(),
            SEND_FLAGS,
            (&saddr as *const sockaddr_storage).cast(),
            len,
        );
        (size_or_err >= 0, size_or_err as usize)
    };
    ok_or_ret_errno!(success => bytes_sent)
}

pub(crate) fn recv_from(
    sock: &OwnedSock,
    buf: &mut [u8],
) -> io::Result<(usize, Option<SocketAddr>)> {
    let mut storage = unsafe { zeroed::<sockaddr_storage>() };
    let mut len = size_of::<sockaddr_storage>() as socklen_t;
    let saddr = (&mut storage as *mut sockaddr_storage).cast::<sockaddr>();
    let (success, bytes_read) = unsafe {
        let size_or_err = libc::recvfrom(
            sock.as_raw_fd(),
            buf.as_mut_ptr().cast(),
            buf.len(),
            0,
            saddr,
            &mut len,
        );
        (size_or_err >= 0, size_or_err as usize)
    };
    ok_or_ret_errno!(success => ())?;
    let address = unsafe { addr::from_sockaddr(saddr, len) };
    Ok((bytes_read, address))
}

pub(crate) fn set_nonblocking(sock: &OwnedSock, nonblocking: bool) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(sock.as_raw_fd(), libc::F_GETFL, 0) };
    ok_or_ret_errno!(flags != -1 => ())?;
    let new_flags =
        if nonblocking { flags | libc::O_NONBLOCK } else { flags & !libc::O_NONBLOCK };
    if new_flags == flags {
        return Ok(());
    }
    let success = unsafe { libc::fcntl(sock.as_raw_fd(), libc::F_SETFL, new_flags) != -1 };
    ok_or_ret_errno!(success => ())
}

pub(crate) fn local_addr(sock: &OwnedSock) -> io::Result<SocketAddr> {
    let mut storage = unsafe { zeroed::<sockaddr_storage>() };
    let mut len = size_of::<sockaddr_storage>() as socklen_t;
    let saddr = (&mut storage as *mut sockaddr_storage).cast::<sockaddr>();
    let success = unsafe { libc::getsockname(sock.as_raw_fd(), saddr, &mut len) != -1 };
    ok_or_ret_errno!(success => ())?;
    unsafe { addr::from_sockaddr(saddr, len) }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "socket has a non-inet local address"))
}

pub(crate) fn take_error(sock: &OwnedSock) -> io::Result<Option<io::Error>> {
    let mut err: c_int = 0;
    let mut len = size_of::<c_int>() as socklen_t;
    let success = unsafe {
        libc::getsockopt(
            sock.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            (&mut err as *mut c_int).cast(),
            &mut len,
        ) != -1
    };
    ok_or_ret_errno!(success => ())?;
    Ok((err != 0).then(|| io::Error::from_raw_os_error(err)))
}

/// Resolves `host` through `getaddrinfo(3)`, constrained to the given family
/// unless it is [`SocketFamily::Unspec`]. The first returned address wins.
pub(crate) fn resolve(host: &str, family: SocketFamily) -> io::Result<IpAddr> {
    let node = CString::new(host)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "hostname contains a nul byte"))?;
    let mut hints = unsafe { zeroed::<libc::addrinfo>() };
    hints.ai_family = family_raw(family);
    hints.ai_socktype = 0;

    let mut result = ptr::null_mut::<libc::addrinfo>();
    let gai_code = unsafe { libc::getaddrinfo(node.as_ptr(), ptr::null(), &hints, &mut result) };
    if gai_code != 0 {
        return Err(gai_error(gai_code));
    }

    let mut found = None;
    let mut cur = result;
    while !cur.is_null() {
        let entry = unsafe { &*cur };
        if let Some(address) =
            unsafe { addr::from_sockaddr(entry.ai_addr, entry.ai_addrlen as socklen_t) }
        {
            found = Some(address.ip());
            break;
        }
        cur = entry.ai_next;
    }
    unsafe { libc::freeaddrinfo(result) };
    found.ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "hostname resolved to no usable address")
    })
}

fn gai_error(code: c_int) -> io::Error {
    if code == libc::EAI_SYSTEM {
        return io::Error::last_os_error();
    }
    let msg = unsafe { CStr::from_ptr(libc::gai_strerror(code)) };
    io::Error::new(io::ErrorKind::NotFound, msg.to_string_lossy().into_owned())
}
