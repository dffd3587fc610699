//! `SocketAddr` ⇄ `sockaddr` conversions.

use super::unixprelude::*;
use libc::{sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, AF_INET, AF_INET6};
use std::{
    mem::{size_of, zeroed},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
};

pub(crate) fn to_sockaddr(addr: SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage = unsafe { zeroed::<sockaddr_storage>() };
    let len = match addr {
        SocketAddr::V4(v4) => {
            let sin = (&mut storage as *mut sockaddr_storage).cast::<sockaddr_in>();
            unsafe {
                (*sin).sin_family = AF_INET as sa_family_t;
                (*sin).sin_port = v4.port().to_be();
                (*sin).sin_addr.s_addr = u32::from(*v4.ip()).to_be();
            }
            size_of::<sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let sin6 = (&mut storage as *mut sockaddr_storage).cast::<sockaddr_in6>();
            unsafe {
                (*sin6).sin6_family = AF_INET6 as sa_family_t;
                (*sin6).sin6_port = v6.port().to_be();
                (*sin6).sin6_flowinfo = v6.flowinfo();
                (*sin6).sin6_addr.s6_addr = v6.ip().octets();
                (*sin6).sin6_scope_id = v6.scope_id();
            }
            size_of::<sockaddr_in6>()
        }
    };
    (storage, len as socklen_t)
}

/// Reads an internet address back out of a `sockaddr`. Returns `None` for
/// non-inet families (unnamed peers, Unix-domain addresses) and for lengths
/// too short to contain the claimed family's structure.
///
/// # Safety
/// `saddr` must point to a buffer of at least `len` initialized bytes laid
/// out as the OS filled it in.
pub(crate) unsafe fn from_sockaddr(saddr: *const sockaddr, len: socklen_t) -> Option<SocketAddr> {
    if saddr.is_null() || (len as usize) < size_of::<sa_family_t>() {
        return None;
    }
    let family = unsafe { (*saddr).sa_family } as c_int;
    match family {
        AF_INET if len as usize >= size_of::<sockaddr_in>() => {
            let sin = unsafe { &*saddr.cast::<sockaddr_in>() };
            let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
            Some(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(sin.sin_port))))
        }
        AF_INET6 if len as usize >= size_of::<sockaddr_in6>() => {
            let sin6 = unsafe { &*saddr.cast::<sockaddr_in6>() };
            let ip = Ipv6Addr::from(sin6.sin6_addr.s6_addr);
            Some(SocketAddr::V6(SocketAddrV6::new(
                ip,
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            )))
        }
        _ => None,
    }
}
