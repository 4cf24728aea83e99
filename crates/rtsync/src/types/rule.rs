//! Policy rule wire structures.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed header of RTM_*RULE messages (mirrors struct fib_rule_hdr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FibRuleHdr {
    /// Address family.
    pub family: u8,
    /// Destination prefix length.
    pub dst_len: u8,
    /// Source prefix length.
    pub src_len: u8,
    /// Type of service.
    pub tos: u8,
    /// Target table id (8-bit legacy field, larger tables go in FRA_TABLE).
    pub table: u8,
    /// Reserved, always zero.
    pub res1: u8,
    /// Reserved, always zero.
    pub res2: u8,
    /// Rule action (FR_ACT_*).
    pub action: u8,
    /// Rule flags.
    pub flags: u32,
}

/// Size of the fib_rule_hdr header.
pub const FIB_RULE_HDR_LEN: usize = std::mem::size_of::<FibRuleHdr>();

/// Rule actions (FR_ACT_*).
pub mod fr_act {
    pub const UNSPEC: u8 = 0;
    /// Look up the rule's target table.
    pub const TO_TBL: u8 = 1;
}

/// Rule attribute types (FRA_*).
pub mod fra {
    pub const FRA_DST: u16 = 1;
    pub const FRA_SRC: u16 = 2;
    pub const FRA_PRIORITY: u16 = 6;
    pub const FRA_TABLE: u16 = 15;

    /// Highest attribute type the parse table indexes.
    pub const FRA_PARSE_MAX: u16 = 16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fib_rule_hdr_layout() {
        assert_eq!(FIB_RULE_HDR_LEN, 12);
    }
}
