//! Strongly-typed link message.

use zerocopy::FromBytes;

use crate::attr::{AttrTable, get};
use crate::error::{Error, Result};
use crate::types::link::{IFINFOMSG_LEN, IfInfoMsg, ifla, iff};

/// A parsed RTM_NEWLINK / RTM_DELLINK payload.
#[derive(Debug, Clone, Default)]
pub struct LinkMessage {
    /// Fixed-size header.
    pub(crate) header: IfInfoMsg,
    /// Interface name (IFLA_IFNAME).
    pub(crate) name: Option<String>,
}

impl LinkMessage {
    /// Parse from a message payload (after the nlmsghdr).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (header, attrs) =
            IfInfoMsg::ref_from_prefix(payload).map_err(|_| Error::Truncated {
                expected: IFINFOMSG_LEN,
                actual: payload.len(),
            })?;

        let table = AttrTable::parse(attrs, ifla::IFLA_PARSE_MAX);
        let name = match table.get(ifla::IFLA_IFNAME) {
            Some(data) => Some(get::string(data)?.to_string()),
            None => None,
        };

        Ok(Self {
            header: *header,
            name,
        })
    }

    /// Interface name, if the notification carried one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Kernel interface index.
    pub fn index(&self) -> u32 {
        self.header.ifi_index as u32
    }

    /// Carrier present: the link is actually usable, not merely
    /// administratively up.
    pub fn is_lower_up(&self) -> bool {
        self.header.ifi_flags & iff::IFF_LOWER_UP != 0
    }

    /// The admin-up bit flipped on in this notification.
    pub fn is_up_transition(&self) -> bool {
        self.header.ifi_flags & self.header.ifi_change & iff::IFF_UP != 0
    }
}
