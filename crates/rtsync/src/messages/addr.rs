//! Strongly-typed address message.

use std::net::IpAddr;

use zerocopy::FromBytes;

use crate::attr::{AttrTable, get};
use crate::error::{Error, Result};
use crate::types::addr::{IFADDRMSG_LEN, IfAddrMsg, ifa, ifa_flags};

/// A parsed RTM_NEWADDR / RTM_DELADDR payload.
#[derive(Debug, Clone, Default)]
pub struct AddressMessage {
    /// Fixed-size header.
    pub(crate) header: IfAddrMsg,
    /// The interface's own address (IFA_LOCAL).
    pub(crate) local: Option<IpAddr>,
}

impl AddressMessage {
    /// Parse from a message payload (after the nlmsghdr).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (header, attrs) =
            IfAddrMsg::ref_from_prefix(payload).map_err(|_| Error::Truncated {
                expected: IFADDRMSG_LEN,
                actual: payload.len(),
            })?;

        let table = AttrTable::parse(attrs, ifa::IFA_PARSE_MAX);
        let local = match table.get(ifa::IFA_LOCAL) {
            Some(data) => Some(get::ip_addr(data)?),
            None => None,
        };

        Ok(Self {
            header: *header,
            local,
        })
    }

    /// Index of the interface the address lives on.
    pub fn index(&self) -> u32 {
        self.header.ifa_index
    }

    /// The interface's own address, if present.
    pub fn local(&self) -> Option<IpAddr> {
        self.local
    }

    /// Prefix length of the address.
    pub fn prefix_len(&self) -> u8 {
        self.header.ifa_prefixlen
    }

    /// Alias addresses never become an interface's primary.
    pub fn is_secondary(&self) -> bool {
        self.header.ifa_flags & ifa_flags::IFA_F_SECONDARY != 0
    }
}
