//! Fixed-layout rtnetlink wire structures and their constant tables.

pub mod addr;
pub mod link;
pub mod route;
pub mod rule;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Generic rtnetlink dump header (mirrors struct rtgenmsg, padded to
/// message alignment).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtGenMsg {
    /// Address family to dump, AF_UNSPEC for everything.
    pub rtgen_family: u8,
    /// Padding to message alignment, always zero.
    pub rtgen_pad: [u8; 3],
}

impl RtGenMsg {
    /// Dump header for the given address family.
    pub fn new(family: u8) -> Self {
        Self {
            rtgen_family: family,
            rtgen_pad: [0; 3],
        }
    }
}

/// rtnetlink multicast group masks for bind-time subscription.
pub mod groups {
    /// Link state changes.
    pub const RTMGRP_LINK: u32 = 0x1;
    /// IPv4 address changes.
    pub const RTMGRP_IPV4_IFADDR: u32 = 0x10;
    /// IPv4 route changes.
    pub const RTMGRP_IPV4_ROUTE: u32 = 0x40;
}
