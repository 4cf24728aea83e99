//! Netlink attribute (rtattr/nlattr) handling.

use crate::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4; // nla_align(size_of::<NlAttr>())

/// Netlink attribute header (mirrors struct nlattr / struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Create a new attribute header.
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Get the payload length (total length minus header).
    pub fn payload_len(&self) -> usize {
        (self.nla_len as usize).saturating_sub(NLA_HDRLEN)
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Iterator over netlink attributes in a buffer.
///
/// A malformed length terminates the walk rather than erroring: everything
/// up to the bad attribute is still yielded.
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    /// Returns (attribute type, payload data).
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLA_HDRLEN {
            return None;
        }

        let attr = match NlAttr::from_bytes(self.data) {
            Ok(a) => a,
            Err(_) => return None,
        };

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN || len > self.data.len() {
            return None;
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        // Move to next attribute
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some((attr.kind(), payload))
    }
}

/// Attributes of one message indexed by type code.
///
/// Types above `max_type` are ignored; a duplicate type keeps the last
/// occurrence, matching the kernel's own parse behavior.
pub struct AttrTable<'a> {
    slots: Vec<Option<&'a [u8]>>,
}

impl<'a> AttrTable<'a> {
    /// Walk `data` and index every attribute with type in `0..=max_type`.
    pub fn parse(data: &'a [u8], max_type: u16) -> Self {
        let mut slots = vec![None; max_type as usize + 1];
        for (kind, payload) in AttrIter::new(data) {
            if kind <= max_type {
                slots[kind as usize] = Some(payload);
            }
        }
        Self { slots }
    }

    /// Payload of the attribute with this type, if present.
    pub fn get(&self, attr_type: u16) -> Option<&'a [u8]> {
        self.slots.get(attr_type as usize).copied().flatten()
    }
}

/// Helper functions for extracting typed values from attribute payloads.
pub mod get {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    /// Extract a u32 value (native endian).
    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        if data.len() < 4 {
            return Err(Error::InvalidAttribute("truncated u32 attribute".into()));
        }
        Ok(u32::from_ne_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Extract a null-terminated string.
    pub fn string(data: &[u8]) -> Result<&str> {
        // Find null terminator or use whole buffer
        let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..len])
            .map_err(|e| Error::InvalidAttribute(format!("invalid UTF-8: {}", e)))
    }

    /// Extract an IP address, selecting the family by payload length.
    pub fn ip_addr(data: &[u8]) -> Result<IpAddr> {
        match data.len() {
            4 => {
                let octets: [u8; 4] = data.try_into().unwrap();
                Ok(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            16 => {
                let octets: [u8; 16] = data.try_into().unwrap();
                Ok(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            n => Err(Error::InvalidAttribute(format!(
                "address attribute of {} bytes",
                n
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(attr_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = NlAttr::new(attr_type, payload.len()).as_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf.resize(nla_align(buf.len()), 0);
        buf
    }

    #[test]
    fn test_align() {
        assert_eq!(nla_align(0), 0);
        assert_eq!(nla_align(1), 4);
        assert_eq!(nla_align(4), 4);
        assert_eq!(nla_align(5), 8);
    }

    #[test]
    fn test_iter_walks_attributes() {
        let mut buf = attr(1, &[0xaa]);
        buf.extend_from_slice(&attr(2, &[1, 2, 3, 4]));

        let attrs: Vec<_> = AttrIter::new(&buf).collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], (1, &[0xaa][..]));
        assert_eq!(attrs[1], (2, &[1, 2, 3, 4][..]));
    }

    #[test]
    fn test_iter_stops_on_malformed_length() {
        let mut buf = attr(1, &[0xaa]);
        // Claims 100 bytes but the buffer ends here.
        buf.extend_from_slice(NlAttr { nla_len: 100, nla_type: 2 }.as_bytes());

        let attrs: Vec<_> = AttrIter::new(&buf).collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].0, 1);
    }

    #[test]
    fn test_table_indexes_by_type() {
        let mut buf = attr(3, b"eth0\0");
        buf.extend_from_slice(&attr(7, &[9, 0, 0, 0]));

        let table = AttrTable::parse(&buf, 8);
        assert_eq!(get::string(table.get(3).unwrap()).unwrap(), "eth0");
        assert_eq!(get::u32_ne(table.get(7).unwrap()).unwrap(), 9);
        assert!(table.get(4).is_none());
    }

    #[test]
    fn test_table_ignores_types_above_max() {
        let buf = attr(12, &[1, 2, 3, 4]);
        let table = AttrTable::parse(&buf, 8);
        assert!(table.get(12).is_none());
    }

    #[test]
    fn test_table_duplicate_keeps_last() {
        let mut buf = attr(4, &[1, 0, 0, 0]);
        buf.extend_from_slice(&attr(4, &[2, 0, 0, 0]));

        let table = AttrTable::parse(&buf, 8);
        assert_eq!(get::u32_ne(table.get(4).unwrap()).unwrap(), 2);
    }

    #[test]
    fn test_get_ip_addr() {
        let v4 = get::ip_addr(&[192, 168, 1, 1]).unwrap();
        assert_eq!(v4, "192.168.1.1".parse::<std::net::IpAddr>().unwrap());
        assert!(get::ip_addr(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_nested_flag_masked_from_kind() {
        let hdr = NlAttr {
            nla_len: 4,
            nla_type: 9 | NLA_F_NESTED,
        };
        assert_eq!(hdr.kind(), 9);
    }
}
