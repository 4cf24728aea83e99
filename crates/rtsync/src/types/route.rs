//! Route wire structures.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed header of RTM_*ROUTE messages (mirrors struct rtmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtMsg {
    /// Address family.
    pub rtm_family: u8,
    /// Destination prefix length.
    pub rtm_dst_len: u8,
    /// Source prefix length.
    pub rtm_src_len: u8,
    /// Type of service.
    pub rtm_tos: u8,
    /// Routing table id (RT_TABLE_*; 8-bit legacy field, larger tables go
    /// in RTA_TABLE).
    pub rtm_table: u8,
    /// Routing protocol (RTPROT_*).
    pub rtm_protocol: u8,
    /// Route scope (RT_SCOPE_*).
    pub rtm_scope: u8,
    /// Route type (RTN_*).
    pub rtm_type: u8,
    /// Route flags.
    pub rtm_flags: u32,
}

/// Size of the rtmsg header.
pub const RTMSG_LEN: usize = std::mem::size_of::<RtMsg>();

/// One hop of a multipath route (mirrors struct rtnexthop). The record
/// length covers the struct plus the attributes that follow it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtNextHop {
    /// Length of this record including nested attributes.
    pub rtnh_len: u16,
    /// Hop flags (RTNH_F_*).
    pub rtnh_flags: u8,
    /// Hop weight, stored as the configured weight minus one.
    pub rtnh_hops: u8,
    /// Outgoing interface index.
    pub rtnh_ifindex: i32,
}

/// Size of the rtnexthop record header.
pub const RTNEXTHOP_LEN: usize = std::mem::size_of::<RtNextHop>();

/// Route attribute types (RTA_*).
pub mod rta {
    pub const RTA_DST: u16 = 1;
    pub const RTA_SRC: u16 = 2;
    pub const RTA_IIF: u16 = 3;
    pub const RTA_OIF: u16 = 4;
    pub const RTA_GATEWAY: u16 = 5;
    pub const RTA_PRIORITY: u16 = 6;
    pub const RTA_PREFSRC: u16 = 7;
    pub const RTA_METRICS: u16 = 8;
    pub const RTA_MULTIPATH: u16 = 9;
    pub const RTA_TABLE: u16 = 15;

    /// Highest attribute type the parse table indexes.
    pub const RTA_PARSE_MAX: u16 = 16;
}

/// Routing table ids (RT_TABLE_*).
pub mod rt_table {
    pub const UNSPEC: u32 = 0;
    pub const DEFAULT: u32 = 253;
    pub const MAIN: u32 = 254;
    pub const LOCAL: u32 = 255;
}

/// Routing protocols (RTPROT_*).
pub mod rtprot {
    pub const UNSPEC: u8 = 0;
    pub const KERNEL: u8 = 2;
    pub const BOOT: u8 = 3;
    pub const STATIC: u8 = 4;
}

/// Route scopes (RT_SCOPE_*).
pub mod rt_scope {
    pub const UNIVERSE: u8 = 0;
    pub const LINK: u8 = 253;
    pub const HOST: u8 = 254;
    pub const NOWHERE: u8 = 255;
}

/// Route types (RTN_*).
pub mod rtn {
    pub const UNSPEC: u8 = 0;
    pub const UNICAST: u8 = 1;
    pub const LOCAL: u8 = 2;
    pub const BROADCAST: u8 = 3;
    pub const UNREACHABLE: u8 = 7;
}
