//! `SocketAddr` ⇄ `SOCKADDR` conversions.

use std::{
    mem::{size_of, zeroed},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
};
use windows_sys::Win32::Networking::WinSock::{
    ADDRESS_FAMILY, AF_INET, AF_INET6, SOCKADDR, SOCKADDR_IN, SOCKADDR_IN6, SOCKADDR_STORAGE,
};

pub(crate) fn to_sockaddr(addr: SocketAddr) -> (SOCKADDR_STORAGE, i32) {
    let mut storage = unsafe { zeroed::<SOCKADDR_STORAGE>() };
    let len = match addr {
        SocketAddr::V4(v4) => {
            let sin = (&mut storage as *mut SOCKADDR_STORAGE).cast::<SOCKADDR_IN>();
            unsafe {
                (*sin).sin_family = AF_INET;
                (*sin).sin_port = v4.port().to_be();
                (*sin).sin_addr.S_un.S_addr = u32::from(*v4.ip()).to_be();
            }
            size_of::<SOCKADDR_IN>()
        }
        SocketAddr::V6(v6) => {
            let sin6 = (&mut storage as *mut SOCKADDR_STORAGE).cast::<SOCKADDR_IN6>();
            unsafe {
                (*sin6).sin6_family = AF_INET6;
                (*sin6).sin6_port = v6.port().to_be();
                (*sin6).sin6_flowinfo = v6.flowinfo();
                (*sin6).sin6_addr.u.Byte = v6.ip().octets();
                (*sin6).Anonymous.sin6_scope_id = v6.scope_id();
            }
            size_of::<SOCKADDR_IN6>()
        }
    };
    (storage, len as i32)
}

/// Reads an internet address back out of a `SOCKADDR`. Returns `None` for
/// non-inet families and for lengths too short for the claimed structure.
///
/// # Safety
/// `saddr` must point to a buffer of at least `len` initialized bytes laid
/// out as the OS filled it in.
pub(crate) unsafe fn from_sockaddr(saddr: *const SOCKADDR, len: i32) -> Option<SocketAddr> {
    if saddr.is_null() || (len as usize) < size_of::<ADDRESS_FAMILY>() {
        return None;
    }
    let family = unsafe { (*saddr).sa_family };
    match family {
        AF_INET if len as usize >= size_of::<SOCKADDR_IN>() => {
            let sin = unsafe { &*saddr.cast::<SOCKADDR_IN>() };
            let ip = Ipv4Addr::from(u32::from_be(unsafe { sin.sin_addr.S_un.S_addr }));
            Some(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(sin.sin_port))))
        }
        AF_INET6 if len as usize >= size_of::<SOCKADDR_IN6>() => {
            let sin6 = unsafe { &*saddr.cast::<SOCKADDR_IN6>() };
            let ip = Ipv6Addr::from(unsafe { sin6.sin6_addr.u.Byte });
            Some(SocketAddr::V6(SocketAddrV6::new(
                ip,
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                unsafe { sin6.Anonymous.sin6_scope_id },
            )))
        }
        _ => None,
    }
}
