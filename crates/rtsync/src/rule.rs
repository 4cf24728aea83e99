//! Source-rule request builders.
//!
//! Each managed interface gets one policy rule: traffic sourced from its
//! primary address looks up the interface's private table. The engine
//! replaces a rule by deleting the old one and installing the new one;
//! the kernel offers no atomic swap on this path.

use std::net::IpAddr;

use crate::builder::MessageBuilder;
use crate::error::{Error, Result};
use crate::message::{NLM_F_ACK, NLM_F_CREATE, NLM_F_REPLACE, NLM_F_REQUEST, NlMsgType};
use crate::route::RouteAction;
use crate::types::route::rt_table;
use crate::types::rule::{FibRuleHdr, fr_act, fra};

/// Prefix length that pins a rule to one source address.
const HOST_PREFIX_V4: u8 = 32;
const HOST_PREFIX_V6: u8 = 128;

/// Build a request that installs or withdraws the source rule mapping
/// `source` into `table`.
pub fn rule_request(action: RouteAction, source: IpAddr, table: u32) -> Result<MessageBuilder> {
    let (msg_type, flags) = match action {
        RouteAction::Add => (
            // The kernel permits duplicate identical rules; REPLACE
            // keeps the install from failing with EEXIST when one
            // survives the preceding delete.
            NlMsgType::RTM_NEWRULE,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_REPLACE,
        ),
        RouteAction::Delete => (NlMsgType::RTM_DELRULE, NLM_F_REQUEST | NLM_F_ACK),
    };

    let mut builder = MessageBuilder::new(msg_type, flags);
    let capacity = builder.capacity();

    let (family, src_len) = match source {
        IpAddr::V4(_) => (libc::AF_INET as u8, HOST_PREFIX_V4),
        IpAddr::V6(_) => (libc::AF_INET6 as u8, HOST_PREFIX_V6),
    };
    let (table_field, table_attr) = if table <= u8::MAX as u32 {
        (table as u8, None)
    } else {
        (rt_table::UNSPEC as u8, Some(table))
    };

    let header = FibRuleHdr {
        family,
        src_len,
        table: table_field,
        action: fr_act::TO_TBL,
        ..Default::default()
    };

    let mut placed = builder.append_header(&header);
    if let Some(id) = table_attr {
        placed = placed && builder.append_attr_u32(fra::FRA_TABLE, id);
    }
    placed = placed && builder.append_attr_addr(fra::FRA_SRC, source);
    if !placed {
        return Err(Error::RequestOverflow { capacity });
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{AttrTable, get};
    use crate::message::{NLMSG_HDRLEN, NlMsgHdr};
    use crate::types::rule::FIB_RULE_HDR_LEN;
    use zerocopy::FromBytes;

    fn parse(msg: &[u8]) -> (FibRuleHdr, AttrTable<'_>) {
        let (header, attrs) = FibRuleHdr::ref_from_prefix(&msg[NLMSG_HDRLEN..]).unwrap();
        (*header, AttrTable::parse(attrs, fra::FRA_PARSE_MAX))
    }

    #[test]
    fn test_install_encodes_host_source_into_table() {
        let msg = rule_request(RouteAction::Add, "10.0.0.7".parse().unwrap(), 101)
            .unwrap()
            .finish();

        let nl = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(nl.nlmsg_type, NlMsgType::RTM_NEWRULE);
        assert_ne!(nl.nlmsg_flags & NLM_F_CREATE, 0);

        let (header, attrs) = parse(&msg);
        assert_eq!(header.family, libc::AF_INET as u8);
        assert_eq!(header.src_len, 32);
        assert_eq!(header.table, 101);
        assert_eq!(header.action, fr_act::TO_TBL);
        assert_eq!(attrs.get(fra::FRA_SRC).unwrap(), &[10, 0, 0, 7]);
        assert_eq!(msg.len(), NLMSG_HDRLEN + FIB_RULE_HDR_LEN + 8);
    }

    #[test]
    fn test_delete_carries_no_create_flags() {
        let msg = rule_request(RouteAction::Delete, "10.0.0.7".parse().unwrap(), 101)
            .unwrap()
            .finish();
        let nl = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(nl.nlmsg_type, NlMsgType::RTM_DELRULE);
        assert_eq!(nl.nlmsg_flags & (NLM_F_CREATE | NLM_F_REPLACE), 0);
    }

    // The kernel allows identical rules to coexist. With a duplicate
    // left behind, delete-then-add removes one copy and the add must
    // still succeed, so the install replaces instead of excluding.
    #[test]
    fn test_install_replaces_duplicate_rules() {
        use crate::message::NLM_F_EXCL;

        let msg = rule_request(RouteAction::Add, "10.0.0.7".parse().unwrap(), 101)
            .unwrap()
            .finish();
        let nl = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_ne!(nl.nlmsg_flags & NLM_F_REPLACE, 0);
        assert_eq!(nl.nlmsg_flags & NLM_F_EXCL, 0);
    }

    #[test]
    fn test_large_table_spills_into_attribute() {
        let msg = rule_request(RouteAction::Add, "10.0.0.7".parse().unwrap(), 12000)
            .unwrap()
            .finish();
        let (header, attrs) = parse(&msg);
        assert_eq!(header.table, 0);
        assert_eq!(get::u32_ne(attrs.get(fra::FRA_TABLE).unwrap()).unwrap(), 12000);
    }
}
