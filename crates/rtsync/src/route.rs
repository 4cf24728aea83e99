//! Route request builders.
//!
//! Two kinds of request come out of this module: single-path unicast
//! routes mirrored between tables, and the balanced multipath default
//! route rebuilt from the whole interface set.

use std::net::{IpAddr, Ipv4Addr};

use crate::builder::MessageBuilder;
use crate::error::{Error, Result};
use crate::iface::Interface;
use crate::message::{NLM_F_ACK, NLM_F_CREATE, NLM_F_REPLACE, NLM_F_REQUEST, NlMsgType};
use crate::types::route::{RtMsg, RtNextHop, rt_table, rt_scope, rta, rtn, rtprot};

/// Whether a route is being installed or withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Install (create or replace).
    Add,
    /// Withdraw.
    Delete,
}

impl RouteAction {
    /// The rtnetlink message type for this action.
    pub fn message_type(self) -> u16 {
        match self {
            RouteAction::Add => NlMsgType::RTM_NEWROUTE,
            RouteAction::Delete => NlMsgType::RTM_DELROUTE,
        }
    }

    fn flags(self) -> u16 {
        match self {
            // Replace semantics: re-mirroring an already-mirrored route
            // must not fail with EEXIST.
            RouteAction::Add => NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_REPLACE,
            RouteAction::Delete => NLM_F_REQUEST | NLM_F_ACK,
        }
    }
}

/// Everything that identifies one unicast route, independent of the table
/// it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Destination prefix (the family's unspecified address for default
    /// routes).
    pub dest: IpAddr,
    /// Destination prefix length.
    pub dst_len: u8,
    /// Source prefix, if the route carries one.
    pub src: Option<IpAddr>,
    /// Source prefix length.
    pub src_len: u8,
    /// Next-hop gateway, if any.
    pub gateway: Option<IpAddr>,
    /// Routing protocol (RTPROT_*).
    pub protocol: u8,
    /// Route scope (RT_SCOPE_*).
    pub scope: u8,
    /// Route type (RTN_*).
    pub kind: u8,
    /// Metric; 0 means unset and is omitted on the wire.
    pub metric: u32,
}

impl Default for RouteDescriptor {
    fn default() -> Self {
        Self {
            dest: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dst_len: 0,
            src: None,
            src_len: 0,
            gateway: None,
            protocol: rtprot::BOOT,
            scope: rt_scope::UNIVERSE,
            kind: rtn::UNICAST,
            metric: 0,
        }
    }
}

impl RouteDescriptor {
    /// Address family, derived from the destination.
    pub fn family(&self) -> u8 {
        match self.dest {
            IpAddr::V4(_) => libc::AF_INET as u8,
            IpAddr::V6(_) => libc::AF_INET6 as u8,
        }
    }

    /// Check if this is a default route.
    pub fn is_default(&self) -> bool {
        self.dst_len == 0
            && match self.dest {
                IpAddr::V4(v4) => v4.is_unspecified(),
                IpAddr::V6(v6) => v6.is_unspecified(),
            }
    }
}

/// Split a table id into the legacy 8-bit header field and the RTA_TABLE
/// spill attribute used for larger ids.
fn split_table(table: u32) -> (u8, Option<u32>) {
    if table <= u8::MAX as u32 {
        (table as u8, None)
    } else {
        (rt_table::UNSPEC as u8, Some(table))
    }
}

/// Build a request that installs or withdraws `route` in `table`, pinned
/// to the interface at `ifindex` when non-zero.
pub fn route_request(
    action: RouteAction,
    route: &RouteDescriptor,
    ifindex: u32,
    table: u32,
) -> Result<MessageBuilder> {
    let mut builder = MessageBuilder::new(action.message_type(), action.flags());
    let capacity = builder.capacity();
    let overflow = move || Error::RequestOverflow { capacity };

    let (table_field, table_attr) = split_table(table);
    let header = RtMsg {
        rtm_family: route.family(),
        rtm_dst_len: route.dst_len,
        rtm_src_len: route.src_len,
        rtm_table: table_field,
        rtm_protocol: route.protocol,
        rtm_scope: route.scope,
        rtm_type: route.kind,
        ..Default::default()
    };

    let mut placed = builder.append_header(&header);
    if let Some(id) = table_attr {
        placed = placed && builder.append_attr_u32(rta::RTA_TABLE, id);
    }
    // Destination is always explicit, 0.0.0.0/0 included.
    placed = placed && builder.append_attr_addr(rta::RTA_DST, route.dest);
    if let Some(src) = route.src {
        placed = placed && builder.append_attr_addr(rta::RTA_SRC, src);
    }
    if let Some(gateway) = route.gateway {
        placed = placed && builder.append_attr_addr(rta::RTA_GATEWAY, gateway);
    }
    if route.metric != 0 {
        placed = placed && builder.append_attr_u32(rta::RTA_PRIORITY, route.metric);
    }
    if ifindex != 0 {
        placed = placed && builder.append_attr_u32(rta::RTA_OIF, ifindex);
    }
    if !placed {
        return Err(overflow());
    }

    Ok(builder)
}

/// Build the multipath default-route replacement for `table`, one nexthop
/// per qualifying interface. Returns `None` when no interface qualifies;
/// the caller treats that as a no-op.
pub fn multipath_request(
    interfaces: &[Interface],
    table: u32,
) -> Result<Option<MessageBuilder>> {
    let candidates: Vec<&Interface> = interfaces
        .iter()
        .filter(|iface| iface.is_multipath_candidate())
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }

    let mut builder =
        MessageBuilder::new(NlMsgType::RTM_NEWROUTE, RouteAction::Add.flags());
    let capacity = builder.capacity();
    let overflow = move || Error::RequestOverflow { capacity };

    let (table_field, table_attr) = split_table(table);
    let header = RtMsg {
        rtm_family: libc::AF_INET as u8,
        rtm_table: table_field,
        rtm_protocol: rtprot::BOOT,
        rtm_scope: rt_scope::UNIVERSE,
        rtm_type: rtn::UNICAST,
        ..Default::default()
    };

    let mut placed = builder.append_header(&header);
    if let Some(id) = table_attr {
        placed = placed && builder.append_attr_u32(rta::RTA_TABLE, id);
    }
    placed = placed
        && builder.append_attr_addr(rta::RTA_DST, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    if !placed {
        return Err(overflow());
    }

    let nest = builder.nest_start(rta::RTA_MULTIPATH).ok_or_else(overflow)?;
    for iface in candidates {
        let record_offset = builder.len();
        let hop = RtNextHop {
            rtnh_len: 0,
            rtnh_flags: 0,
            // The kernel stores weight-1; a configured weight of 1 is 0
            // on the wire.
            rtnh_hops: iface.balance_weight.saturating_sub(1),
            rtnh_ifindex: iface.index as i32,
        };
        if !builder.append_header(&hop) || !builder.append_attr_addr(rta::RTA_GATEWAY, iface.gateways[0]) {
            return Err(overflow());
        }
        let record_len = builder.len() - record_offset;
        builder.patch_u16_at(record_offset, record_len as u16);
    }
    builder.nest_end(nest);

    Ok(Some(builder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttrTable;
    use crate::message::{NLMSG_HDRLEN, NlMsgHdr};
    use crate::messages::RouteMessage;
    use crate::types::route::RTNEXTHOP_LEN;
    use zerocopy::FromBytes;

    fn iface(name: &str, index: u32, balance: bool, weight: u8, gws: &[&str]) -> Interface {
        Interface {
            name: name.to_string(),
            index,
            balance,
            balance_weight: weight,
            gateways: gws.iter().map(|g| g.parse().unwrap()).collect(),
            route_table: 100 + index,
            ..Default::default()
        }
    }

    #[test]
    fn test_route_request_round_trip() {
        let desc = RouteDescriptor {
            dest: "172.16.0.0".parse().unwrap(),
            dst_len: 16,
            gateway: Some("10.0.0.1".parse().unwrap()),
            metric: 20,
            ..Default::default()
        };
        let msg = route_request(RouteAction::Add, &desc, 4, 101).unwrap().finish();

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_NEWROUTE);
        assert_ne!(header.nlmsg_flags & NLM_F_REPLACE, 0);

        let parsed = RouteMessage::parse(&msg[NLMSG_HDRLEN..]).unwrap();
        assert_eq!(parsed.to_descriptor().dest, desc.dest);
        assert_eq!(parsed.to_descriptor().dst_len, desc.dst_len);
        assert_eq!(parsed.to_descriptor().gateway, desc.gateway);
        assert_eq!(parsed.to_descriptor().metric, desc.metric);
        assert_eq!(parsed.oif(), Some(4));
        assert_eq!(parsed.table_id(), 101);
    }

    #[test]
    fn test_zero_metric_not_encoded() {
        let desc = RouteDescriptor {
            dest: "10.1.0.0".parse().unwrap(),
            dst_len: 16,
            ..Default::default()
        };
        let msg = route_request(RouteAction::Add, &desc, 0, 254).unwrap().finish();
        let parsed = RouteMessage::parse(&msg[NLMSG_HDRLEN..]).unwrap();
        assert!(parsed.priority.is_none());
        assert!(parsed.oif().is_none());
    }

    #[test]
    fn test_delete_has_no_create_flags() {
        let desc = RouteDescriptor::default();
        let msg = route_request(RouteAction::Delete, &desc, 2, 254).unwrap().finish();
        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_DELROUTE);
        assert_eq!(header.nlmsg_flags & (NLM_F_CREATE | NLM_F_REPLACE), 0);
    }

    #[test]
    fn test_large_table_spills_into_attribute() {
        let desc = RouteDescriptor::default();
        let msg = route_request(RouteAction::Add, &desc, 0, 1000).unwrap().finish();
        let parsed = RouteMessage::parse(&msg[NLMSG_HDRLEN..]).unwrap();
        assert_eq!(parsed.table_id(), 1000);
    }

    #[test]
    fn test_multipath_selects_qualifying_interfaces() {
        let interfaces = vec![
            iface("wan0", 2, true, 4, &["10.0.0.1"]),
            iface("wan1", 3, true, 1, &["10.1.0.1"]),
            iface("wan2", 0, true, 2, &["10.2.0.1"]), // no index yet
            iface("dmz0", 5, false, 2, &["10.3.0.1"]), // not balancing
            iface("wan3", 6, true, 2, &[]),            // no gateway
        ];

        let msg = multipath_request(&interfaces, 254).unwrap().unwrap().finish();
        let table = AttrTable::parse(
            &msg[NLMSG_HDRLEN + crate::types::route::RTMSG_LEN..],
            rta::RTA_PARSE_MAX,
        );
        let mp = table.get(rta::RTA_MULTIPATH).unwrap();

        // Two qualifying interfaces, two fixed-size records.
        let mut hops = Vec::new();
        let mut rest = mp;
        while !rest.is_empty() {
            let (hop, _) = RtNextHop::ref_from_prefix(rest).unwrap();
            let len = hop.rtnh_len as usize;
            hops.push(*hop);
            rest = &rest[len..];
        }
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0].rtnh_ifindex, 2);
        assert_eq!(hops[0].rtnh_hops, 3); // weight 4, stored minus one
        assert_eq!(hops[1].rtnh_ifindex, 3);
        assert_eq!(hops[1].rtnh_hops, 0); // weight 1, stored minus one
        // Each record covers the hop struct plus its gateway attribute.
        assert_eq!(hops[0].rtnh_len as usize, RTNEXTHOP_LEN + 8);
    }

    #[test]
    fn test_multipath_with_no_candidates_is_noop() {
        let interfaces = vec![
            iface("wan2", 0, true, 2, &["10.2.0.1"]),
            iface("dmz0", 5, false, 2, &["10.3.0.1"]),
        ];
        assert!(multipath_request(&interfaces, 254).unwrap().is_none());
    }
}
