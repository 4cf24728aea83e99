//! Strongly-typed route message.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use zerocopy::FromBytes;

use crate::attr::{AttrTable, get};
use crate::error::{Error, Result};
use crate::route::RouteDescriptor;
use crate::types::route::{RTMSG_LEN, RtMsg, rta};

/// A parsed RTM_NEWROUTE / RTM_DELROUTE payload.
#[derive(Debug, Clone, Default)]
pub struct RouteMessage {
    /// Fixed-size header.
    pub(crate) header: RtMsg,
    /// Destination prefix (RTA_DST).
    pub(crate) destination: Option<IpAddr>,
    /// Next-hop gateway (RTA_GATEWAY).
    pub(crate) gateway: Option<IpAddr>,
    /// Outgoing interface index (RTA_OIF).
    pub(crate) oif: Option<u32>,
    /// Route metric (RTA_PRIORITY).
    pub(crate) priority: Option<u32>,
    /// Table id when it does not fit the 8-bit header field (RTA_TABLE).
    pub(crate) table: Option<u32>,
}

impl RouteMessage {
    /// Parse from a message payload (after the nlmsghdr).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (header, attrs) = RtMsg::ref_from_prefix(payload).map_err(|_| Error::Truncated {
            expected: RTMSG_LEN,
            actual: payload.len(),
        })?;

        let table = AttrTable::parse(attrs, rta::RTA_PARSE_MAX);
        let destination = match table.get(rta::RTA_DST) {
            Some(data) => Some(get::ip_addr(data)?),
            None => None,
        };
        let gateway = match table.get(rta::RTA_GATEWAY) {
            Some(data) => Some(get::ip_addr(data)?),
            None => None,
        };
        let oif = match table.get(rta::RTA_OIF) {
            Some(data) => Some(get::u32_ne(data)?),
            None => None,
        };
        let priority = match table.get(rta::RTA_PRIORITY) {
            Some(data) => Some(get::u32_ne(data)?),
            None => None,
        };
        let table_attr = match table.get(rta::RTA_TABLE) {
            Some(data) => Some(get::u32_ne(data)?),
            None => None,
        };

        Ok(Self {
            header: *header,
            destination,
            gateway,
            oif,
            priority,
            table: table_attr,
        })
    }

    /// Address family of the route.
    pub fn family(&self) -> u8 {
        self.header.rtm_family
    }

    /// Check if this is an IPv4 route.
    pub fn is_ipv4(&self) -> bool {
        self.header.rtm_family == libc::AF_INET as u8
    }

    /// Destination prefix length.
    pub fn dst_len(&self) -> u8 {
        self.header.rtm_dst_len
    }

    /// Destination prefix; the family's unspecified address when the
    /// kernel omitted RTA_DST (default routes).
    pub fn destination(&self) -> IpAddr {
        self.destination.unwrap_or(if self.is_ipv4() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        })
    }

    /// Next-hop gateway, if any.
    pub fn gateway(&self) -> Option<IpAddr> {
        self.gateway
    }

    /// Outgoing interface index, if any.
    pub fn oif(&self) -> Option<u32> {
        self.oif
    }

    /// Route metric; 0 when absent.
    pub fn metric(&self) -> u32 {
        self.priority.unwrap_or(0)
    }

    /// Effective table id (RTA_TABLE wins over the legacy header field).
    pub fn table_id(&self) -> u32 {
        self.table.unwrap_or(self.header.rtm_table as u32)
    }

    /// Check if this is a default route (zero-length destination prefix).
    pub fn is_default(&self) -> bool {
        self.header.rtm_dst_len == 0
    }

    /// The route as a descriptor this engine can re-encode into another
    /// table.
    pub fn to_descriptor(&self) -> RouteDescriptor {
        RouteDescriptor {
            dest: self.destination(),
            dst_len: self.header.rtm_dst_len,
            src: None,
            src_len: 0,
            gateway: self.gateway,
            protocol: self.header.rtm_protocol,
            scope: self.header.rtm_scope,
            kind: self.header.rtm_type,
            metric: self.metric(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{NlAttr, nla_align};
    use crate::types::route::{rt_scope, rt_table, rtn, rtprot};
    use zerocopy::IntoBytes;

    fn route_payload(dst: Option<[u8; 4]>, dst_len: u8, gw: Option<[u8; 4]>, oif: u32) -> Vec<u8> {
        let header = RtMsg {
            rtm_family: libc::AF_INET as u8,
            rtm_dst_len: dst_len,
            rtm_table: rt_table::MAIN as u8,
            rtm_protocol: rtprot::BOOT,
            rtm_scope: rt_scope::UNIVERSE,
            rtm_type: rtn::UNICAST,
            ..Default::default()
        };
        let mut buf = header.as_bytes().to_vec();
        let mut attr = |attr_type: u16, data: &[u8]| {
            buf.extend_from_slice(NlAttr::new(attr_type, data.len()).as_bytes());
            buf.extend_from_slice(data);
            buf.resize(nla_align(buf.len()), 0);
        };
        if let Some(octets) = dst {
            attr(rta::RTA_DST, &octets);
        }
        if let Some(octets) = gw {
            attr(rta::RTA_GATEWAY, &octets);
        }
        attr(rta::RTA_OIF, &oif.to_ne_bytes());
        buf
    }

    #[test]
    fn test_parse_route() {
        let payload = route_payload(Some([172, 16, 0, 0]), 16, Some([10, 0, 0, 1]), 2);
        let msg = RouteMessage::parse(&payload).unwrap();
        assert!(msg.is_ipv4());
        assert_eq!(msg.destination(), "172.16.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(msg.dst_len(), 16);
        assert_eq!(msg.gateway(), Some("10.0.0.1".parse().unwrap()));
        assert_eq!(msg.oif(), Some(2));
        assert_eq!(msg.table_id(), rt_table::MAIN);
        assert!(!msg.is_default());
    }

    #[test]
    fn test_default_route_has_unspecified_destination() {
        let payload = route_payload(None, 0, Some([10, 0, 0, 1]), 2);
        let msg = RouteMessage::parse(&payload).unwrap();
        assert!(msg.is_default());
        assert_eq!(msg.destination(), "0.0.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(msg.metric(), 0);
    }

    #[test]
    fn test_descriptor_carries_route_identity() {
        let payload = route_payload(Some([192, 168, 7, 0]), 24, Some([10, 0, 0, 1]), 3);
        let msg = RouteMessage::parse(&payload).unwrap();
        let desc = msg.to_descriptor();
        assert_eq!(desc.dest, "192.168.7.0".parse::<IpAddr>().unwrap());
        assert_eq!(desc.dst_len, 24);
        assert_eq!(desc.gateway, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(desc.metric, 0);
    }
}
