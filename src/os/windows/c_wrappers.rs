use super::{addr, winprelude::*, OwnedSock};
use crate::{SocketDomain, SocketFamily, SocketProtocol, SocketType};
use std::{
    ffi::CString,
    io,
    mem::{size_of, zeroed},
    net::{IpAddr, SocketAddr},
    ptr,
};
use windows_sys::Win32::Networking::WinSock::{
    self as ws, ADDRINFOA, AF_INET, AF_INET6, AF_UNSPEC, FIONBIO, INVALID_SOCKET, IPPROTO_TCP,
    IPPROTO_UDP, SOCKADDR, SOCKADDR_STORAGE, SOCKET_ERROR, SOCK_DGRAM, SOCK_STREAM, SOL_SOCKET,
    SO_ERROR, WSADATA,
};

/// The Winsock error slot, as the last failed Winsock call left it.
fn last_wsa_error() -> io::Error {
    io::Error::from_raw_os_error(unsafe { ws::WSAGetLastError() })
}

fn ok_or_wsa_err(success: bool) -> io::Result<()> {
    if success {
        Ok(())
    } else {
        Err(last_wsa_error())
    }
}

pub(crate) fn init_subsystem() -> io::Result<()> {
    let mut wsa_data = unsafe { zeroed::<WSADATA>() };
    // Winsock 2.2, as every Windows since 98 speaks it.
    let code = unsafe { ws::WSAStartup(0x0202, &mut wsa_data) };
    if code != 0 {
        // WSAStartup returns the error directly instead of setting the slot.
        return Err(io::Error::from_raw_os_error(code));
    }
    Ok(())
}

pub(crate) fn teardown_subsystem() {
    unsafe { ws::WSACleanup() };
}

fn family_raw(family: SocketFamily) -> i32 {
    (match family {
        SocketFamily::Unspec => AF_UNSPEC,
        SocketFamily::Inet => AF_INET,
        SocketFamily::Inet6 => AF_INET6,
    }) as i32
}

fn type_raw(ty: SocketType) -> i32 {
    match ty {
        SocketType::Stream => SOCK_STREAM as i32,
        SocketType::Datagram => SOCK_DGRAM as i32,
    }
}

fn protocol_raw(protocol: SocketProtocol) -> i32 {
    match protocol {
        SocketProtocol::Tcp => IPPROTO_TCP as i32,
        SocketProtocol::Udp => IPPROTO_UDP as i32,
    }
}

pub(crate) fn create(
    family: SocketFamily,
    domain: SocketDomain,
    ty: SocketType,
    protocol: SocketProtocol,
) -> io::Result<OwnedSock> {
    let SocketDomain::Inet = domain else {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Unix-domain sockets are not supported on Windows",
        ));
    };
    let raw = unsafe { ws::socket(family_raw(family), type_raw(ty), protocol_raw(protocol)) };
    if raw == INVALID_SOCKET {
        return Err(last_wsa_error());
    }
    Ok(unsafe {
        // SAFETY: we just created this socket
        OwnedSock::from_raw_socket(raw as RawSocket)
    })
}

pub(crate) fn bind(sock: &OwnedSock, address: SocketAddr) -> io::Result<()> {
    let (saddr, len) = addr::to_sockaddr(address);
    let code = unsafe {
        ws::bind(sock.as_raw_socket() as SOCKET, (&saddr as *const SOCKADDR_STORAGE).cast(), len)
    };
    ok_or_wsa_err(code != SOCKET_ERROR)
}

pub(crate) fn listen(sock: &OwnedSock, backlog: i32) -> io::Result<()> {
    let code = unsafe { ws::listen(sock.as_raw_socket() as SOCKET, backlog) };
    ok_or_wsa_err(code != SOCKET_ERROR)
}

pub(crate) fn accept(sock: &OwnedSock) -> io::Result<(OwnedSock, Option<SocketAddr>)> {
    let mut storage = unsafe { zeroed::<SOCKADDR_STORAGE>() };
    let mut len = size_of::<SOCKADDR_STORAGE>() as i32;
    let saddr = (&mut storage as *mut SOCKADDR_STORAGE).cast::<SOCKADDR>();
    let raw = unsafe { ws::accept(sock.as_raw_socket() as SOCKET, saddr, &mut len) };
    if raw == INVALID_SOCKET {
        return Err(last_wsa_error());
    }
    let peer = unsafe {
        // SAFETY: freshly accepted socket, exclusively ours
        OwnedSock::from_raw_socket(raw as RawSocket)
    };
    let address = unsafe { addr::from_sockaddr(saddr, len) };
    Ok((peer, address))
}

pub(crate) fn connect(sock: &OwnedSock, address: SocketAddr) -> io::Result<()> {
    let (saddr, len) = addr::to_sockaddr(address);
    let code = unsafe {
        ws::connect(sock.as_raw_socket() as SOCKET, (&saddr as *const SOCKADDR_STORAGE).cast(), len)
    };
    ok_or_wsa_err(code != SOCKET_ERROR)
}

fn clip_len(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

pub(crate) fn send(sock: &OwnedSock, buf: &[u8]) -> io::Result<usize> {
    let size_or_err =
        unsafe { ws::send(sock.as_raw_socket() as SOCKET, buf.as_ptr(), clip_len(buf.len()), 0) };
    ok_or_wsa_err(size_or_err != SOCKET_ERROR)?;
    Ok(size_or_err as usize)
}

pub(crate) fn recv(sock: &OwnedSock, buf: &mut [u8]) -> io::Result<usize> {
    let size_or_err = unsafe {
        ws::recv(sock.as_raw_socket() as SOCKET, buf.as_mut_ptr(), clip_len(buf.len()), 0)
    };
    ok_or_wsa_err(size_or_err != SOCKET_ERROR)?;
    Ok(size_or_err as usize)
}

pub(crate) fn send_to(sock: &OwnedSock, buf: &[u8], address: SocketAddr) -> io::Result<usize> {
    let (saddr, len) = addr::to_sockaddr(address);
    let size_or_err = unsafe {
        ws::sendto(
            sock.as_raw_socket() as SOCKET,
            buf.as_ptr(),
            clip_len(buf.len()),
            0,
            (&saddr as *const SOCKADDR_STORAGE).cast(),
            len,
        )
    };
    ok_or_wsa_err(size_or_err != SOCKET_ERROR)?;
    Ok(size_or_err as usize)
}

pub(crate) fn recv_from(
    sock: &OwnedSock,
    buf: &mut [u8],
) -> io::Result<(usize, Option<SocketAddr>)> {
    let mut storage = unsafe { zeroed::<SOCKADDR_STORAGE>() };
    let mut len = size_of::<SOCKADDR_STORAGE>() as i32;
    let saddr = (&mut storage as *mut SOCKADDR_STORAGE).cast::<SOCKADDR>();
    let size_or_err = unsafe {
        ws::recvfrom(
            sock.as_raw_socket() as SOCKET,
            buf.as_mut_ptr(),
            clip_len(buf.len()),
            0,
            saddr,
            &mut len,
        )
    };
    ok_or_wsa_err(size_or_err != SOCKET_ERROR)?;
    let address = unsafe { addr::from_sockaddr(saddr, len) };
    Ok((size_or_err as usize, address))
}

pub(crate) fn set_nonblocking(sock: &OwnedSock, nonblocking: bool) -> io::Result<()> {
    let mut mode: u32 = nonblocking as u32;
    let code = unsafe { ws::ioctlsocket(sock.as_raw_socket() as SOCKET, FIONBIO, &mut mode) };
    ok_or_wsa_err(code != SOCKET_ERROR)
}

pub(crate) fn local_addr(sock: &OwnedSock) -> io::Result<SocketAddr> {
    let mut storage = unsafe { zeroed::<SOCKADDR_STORAGE>() };
    let mut len = size_of::<SOCKADDR_STORAGE>() as i32;
    let saddr = (&mut storage as *mut SOCKADDR_STORAGE).cast::<SOCKADDR>();
    let code = unsafe { ws::getsockname(sock.as_raw_socket() as SOCKET, saddr, &mut len) };
    ok_or_wsa_err(code != SOCKET_ERROR)?;
    unsafe { addr::from_sockaddr(saddr, len) }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "socket has a non-inet local address"))
}

pub(crate) fn take_error(sock: &OwnedSock) -> io::Result<Option<io::Error>> {
    let mut err: i32 = 0;
    let mut len = size_of::<i32>() as i32;
    let code = unsafe {
        ws::getsockopt(
            sock.as_raw_socket() as SOCKET,
            SOL_SOCKET as i32,
            SO_ERROR as i32,
            (&mut err as *mut i32).cast(),
            &mut len,
        )
    };
    ok_or_wsa_err(code != SOCKET_ERROR)?;
    Ok((err != 0).then(|| io::Error::from_raw_os_error(err)))
}

/// Resolves `host` through `getaddrinfo`, constrained to the given family
/// unless it is [`SocketFamily::Unspec`]. The first returned address wins.
pub(crate) fn resolve(host: &str, family: SocketFamily) -> io::Result<IpAddr> {
    let node = CString::new(host)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "hostname contains a nul byte"))?;
    let mut hints = unsafe { zeroed::<ADDRINFOA>() };
    hints.ai_family = family_raw(family);

    let mut result = ptr::null_mut::<ADDRINFOA>();
    let code = unsafe {
        ws::getaddrinfo(node.as_ptr().cast(), ptr::null(), &hints, &mut result)
    };
    if code != 0 {
        // Winsock getaddrinfo reports WSA error codes directly.
        return Err(io::Error::from_raw_os_error(code));
    }

    let mut found = None;
    let mut cur = result;
    while !cur.is_null() {
        let entry = unsafe { &*cur };
        if let Some(address) =
            unsafe { addr::from_sockaddr(entry.ai_addr, clip_len(entry.ai_addrlen)) }
        {
            found = Some(address.ip());
            break;
        }
        cur = entry.ai_next;
    }
    unsafe { ws::freeaddrinfo(result) };
    found.ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "hostname resolved to no usable address")
    })
}
