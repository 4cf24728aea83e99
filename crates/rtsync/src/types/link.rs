//! Link (interface) wire structures.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed header of RTM_*LINK messages (mirrors struct ifinfomsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IfInfoMsg {
    /// Address family, AF_UNSPEC for links.
    pub ifi_family: u8,
    /// Padding, always zero.
    pub ifi_pad: u8,
    /// Device type (ARPHRD_*).
    pub ifi_type: u16,
    /// Interface index.
    pub ifi_index: i32,
    /// Device flags (IFF_*).
    pub ifi_flags: u32,
    /// Mask of flags that changed in this notification.
    pub ifi_change: u32,
}

/// Size of the ifinfomsg header.
pub const IFINFOMSG_LEN: usize = std::mem::size_of::<IfInfoMsg>();

/// Interface flags (subset this engine inspects).
pub mod iff {
    /// Interface is administratively up.
    pub const IFF_UP: u32 = 0x1;
    /// Driver signals L1 carrier (the usable-link flag).
    pub const IFF_LOWER_UP: u32 = 0x10000;
}

/// Link attribute types (IFLA_*).
pub mod ifla {
    pub const IFLA_ADDRESS: u16 = 1;
    pub const IFLA_IFNAME: u16 = 3;
    pub const IFLA_MTU: u16 = 4;
    pub const IFLA_OPERSTATE: u16 = 16;

    /// Highest attribute type the parse table indexes.
    pub const IFLA_PARSE_MAX: u16 = 32;
}
