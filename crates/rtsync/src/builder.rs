//! Message builder for constructing netlink requests.
//!
//! The builder grows a byte buffer up to an explicit capacity ceiling.
//! Every append reports success or rejection; a rejected append leaves the
//! message untouched so a caller can fail the whole request cleanly.

use std::net::IpAddr;

use zerocopy::{Immutable, IntoBytes};

use crate::attr::{NLA_F_NESTED, NlAttr, nla_align};
use crate::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

/// Default capacity ceiling for a request message.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Token returned when starting a nested attribute.
/// Used to finalize the nested attribute length.
#[derive(Debug, Clone, Copy)]
pub struct NestToken {
    /// Offset of the nested attribute header in the buffer.
    offset: usize,
}

/// Builder for constructing netlink messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
    capacity: usize,
}

impl MessageBuilder {
    /// Create a new message builder with the given type and flags.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self::with_capacity(msg_type, flags, DEFAULT_CAPACITY)
    }

    /// Create a builder with an explicit capacity ceiling (total message
    /// bytes, header included).
    pub fn with_capacity(msg_type: u16, flags: u16, capacity: usize) -> Self {
        let header = NlMsgHdr::new(msg_type, flags);
        let mut buf = vec![0u8; NLMSG_HDRLEN];
        buf[..std::mem::size_of::<NlMsgHdr>()].copy_from_slice(header.as_bytes());
        Self { buf, capacity }
    }

    /// Get the current message length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the message is empty (header only).
    pub fn is_empty(&self) -> bool {
        self.buf.len() == NLMSG_HDRLEN
    }

    /// The capacity ceiling this builder enforces.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn fits(&self, extra: usize) -> bool {
        nla_align(self.buf.len() + extra) <= self.capacity
    }

    /// Append raw bytes (with alignment padding). Returns false and leaves
    /// the message untouched if the bytes do not fit.
    pub fn append_bytes(&mut self, data: &[u8]) -> bool {
        if !self.fits(data.len()) {
            return false;
        }
        self.buf.extend_from_slice(data);
        let aligned = nlmsg_align(self.buf.len());
        self.buf.resize(aligned, 0);
        true
    }

    /// Append a fixed-layout wire struct.
    pub fn append_header<T: IntoBytes + Immutable>(&mut self, header: &T) -> bool {
        self.append_bytes(header.as_bytes())
    }

    /// Append an attribute with the given type and data.
    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) -> bool {
        if !self.fits(NlAttr::new(attr_type, data.len()).nla_len as usize) {
            return false;
        }
        let attr = NlAttr::new(attr_type, data.len());
        self.buf.extend_from_slice(attr.as_bytes());
        self.buf.extend_from_slice(data);
        let aligned = nla_align(self.buf.len());
        self.buf.resize(aligned, 0);
        true
    }

    /// Append a u32 attribute (native endian).
    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) -> bool {
        self.append_attr(attr_type, &value.to_ne_bytes())
    }

    /// Append an IP address attribute (4 or 16 bytes by family).
    pub fn append_attr_addr(&mut self, attr_type: u16, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => self.append_attr(attr_type, &v4.octets()),
            IpAddr::V6(v6) => self.append_attr(attr_type, &v6.octets()),
        }
    }

    /// Start a nested attribute. Returns a token to finalize it, or None
    /// if even the container header does not fit.
    pub fn nest_start(&mut self, attr_type: u16) -> Option<NestToken> {
        if !self.fits(crate::attr::NLA_HDRLEN) {
            return None;
        }
        let offset = self.buf.len();
        // Placeholder header; length patched by nest_end.
        let attr = NlAttr::new(attr_type | NLA_F_NESTED, 0);
        self.buf.extend_from_slice(attr.as_bytes());
        Some(NestToken { offset })
    }

    /// End a nested attribute started with `nest_start`.
    pub fn nest_end(&mut self, token: NestToken) {
        let len = self.buf.len() - token.offset;
        self.patch_u16_at(token.offset, len as u16);
        let aligned = nla_align(self.buf.len());
        self.buf.resize(aligned, 0);
    }

    /// Overwrite a native-endian u16 already in the buffer. Used to patch
    /// record lengths that are only known after their payload is appended.
    pub(crate) fn patch_u16_at(&mut self, offset: usize, value: u16) {
        self.buf[offset..offset + 2].copy_from_slice(&value.to_ne_bytes());
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        self.buf[8..12].copy_from_slice(&seq.to_ne_bytes());
    }

    /// Set the sending port ID.
    pub fn set_pid(&mut self, pid: u32) {
        self.buf[12..16].copy_from_slice(&pid.to_ne_bytes());
    }

    /// Finalize and return the message bytes.
    pub fn finish(mut self) -> Vec<u8> {
        // Update message length in header
        let len = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&len.to_ne_bytes());
        self.buf
    }

    /// Get the current buffer for inspection.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
