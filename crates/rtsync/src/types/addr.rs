//! Address wire structures.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed header of RTM_*ADDR messages (mirrors struct ifaddrmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IfAddrMsg {
    /// Address family (AF_INET / AF_INET6).
    pub ifa_family: u8,
    /// Prefix length.
    pub ifa_prefixlen: u8,
    /// Address flags (IFA_F_*).
    pub ifa_flags: u8,
    /// Address scope.
    pub ifa_scope: u8,
    /// Interface index the address lives on.
    pub ifa_index: u32,
}

/// Size of the ifaddrmsg header.
pub const IFADDRMSG_LEN: usize = std::mem::size_of::<IfAddrMsg>();

/// Address flags (subset this engine inspects).
pub mod ifa_flags {
    /// Secondary (alias) address; never the interface's primary.
    pub const IFA_F_SECONDARY: u8 = 0x01;
}

/// Address attribute types (IFA_*).
pub mod ifa {
    /// Peer address on point-to-point links, local otherwise.
    pub const IFA_ADDRESS: u16 = 1;
    /// The interface's own address.
    pub const IFA_LOCAL: u16 = 2;
    pub const IFA_LABEL: u16 = 3;
    pub const IFA_BROADCAST: u16 = 4;

    /// Highest attribute type the parse table indexes.
    pub const IFA_PARSE_MAX: u16 = 8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifaddrmsg_layout() {
        assert_eq!(IFADDRMSG_LEN, 8);
    }
}
