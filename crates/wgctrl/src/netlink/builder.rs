//! Builders for netlink attribute streams and messages.

use zerocopy::{Immutable, IntoBytes};

use super::attr::{NLA_F_NESTED, NlAttr, nla_align};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

/// Token returned when starting a nested attribute.
/// Used to finalize the nested attribute length.
#[derive(Debug, Clone, Copy)]
pub struct NestToken {
    /// Offset of the nested attribute header in the buffer.
    offset: usize,
}

/// Builder for a stream of (possibly nested) attributes.
///
/// Produces the bytes that follow the family header of a message, which
/// is how encoded requests travel between the encoder and a transport.
#[derive(Debug, Clone, Default)]
pub struct AttrBuilder {
    buf: Vec<u8>,
}

impl AttrBuilder {
    /// Create an empty attribute stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current stream length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if no attribute has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append an attribute with the given type and data.
    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) {
        let attr = NlAttr::new(attr_type, data.len());
        self.buf.extend_from_slice(attr.as_bytes());
        self.buf.extend_from_slice(data);
        // Pad to alignment
        let aligned = nla_align(self.buf.len());
        self.buf.resize(aligned, 0);
    }

    /// Append a u8 attribute.
    pub fn append_attr_u8(&mut self, attr_type: u16, value: u8) {
        self.append_attr(attr_type, &[value]);
    }

    /// Append a u16 attribute (native endian).
    pub fn append_attr_u16(&mut self, attr_type: u16, value: u16) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    /// Append a u32 attribute (native endian).
    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    /// Append a u64 attribute (native endian).
    pub fn append_attr_u64(&mut self, attr_type: u16, value: u64) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    /// Append a null-terminated string attribute.
    pub fn append_attr_str(&mut self, attr_type: u16, value: &str) {
        let mut data = value.as_bytes().to_vec();
        data.push(0); // null terminator
        self.append_attr(attr_type, &data);
    }

    /// Append an already-encoded attribute stream as the payload of a
    /// nested attribute.
    pub fn append_nested(&mut self, attr_type: u16, inner: &AttrBuilder) {
        self.append_attr(attr_type | NLA_F_NESTED, inner.as_bytes());
    }

    /// Start a nested attribute. Returns a token to finalize it.
    pub fn nest_start(&mut self, attr_type: u16) -> NestToken {
        let offset = self.buf.len();
        // Write placeholder header with nested flag
        let attr = NlAttr::new(attr_type | NLA_F_NESTED, 0);
        self.buf.extend_from_slice(attr.as_bytes());
        NestToken { offset }
    }

    /// End a nested attribute started with `nest_start`.
    pub fn nest_end(&mut self, token: NestToken) {
        let len = self.buf.len() - token.offset;
        // Update the length in the nested attribute header
        let len_bytes = (len as u16).to_ne_bytes();
        self.buf[token.offset] = len_bytes[0];
        self.buf[token.offset + 1] = len_bytes[1];
        // Ensure alignment
        let aligned = nla_align(self.buf.len());
        self.buf.resize(aligned, 0);
    }

    /// Get the current buffer for inspection.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Finalize and return the attribute bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Builder for constructing complete netlink messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    /// Create a new message builder with the given type and flags.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        let header = NlMsgHdr::new(msg_type, flags);
        let mut buf = vec![0u8; NLMSG_HDRLEN];
        buf[..std::mem::size_of::<NlMsgHdr>()].copy_from_slice(header.as_bytes());
        Self { buf }
    }

    /// Get the current message length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the message is empty (header only).
    pub fn is_empty(&self) -> bool {
        self.buf.len() == NLMSG_HDRLEN
    }

    /// Append raw bytes to the message (with alignment padding).
    pub fn append_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        // Pad to alignment
        let aligned = nlmsg_align(self.buf.len());
        self.buf.resize(aligned, 0);
    }

    /// Append a fixed-layout header struct to the message.
    pub fn append<T: IntoBytes + Immutable>(&mut self, data: &T) {
        self.append_bytes(data.as_bytes());
    }

    /// Append an encoded attribute stream.
    pub fn append_attrs(&mut self, attrs: &[u8]) {
        self.append_bytes(attrs);
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        let bytes = seq.to_ne_bytes();
        self.buf[8..12].copy_from_slice(&bytes);
    }

    /// Set the port ID.
    pub fn set_pid(&mut self, pid: u32) {
        let bytes = pid.to_ne_bytes();
        self.buf[12..16].copy_from_slice(&bytes);
    }

    /// Finalize and return the message bytes.
    pub fn finish(mut self) -> Vec<u8> {
        // Update message length in header
        let len = self.buf.len() as u32;
        let len_bytes = len.to_ne_bytes();
        self.buf[0..4].copy_from_slice(&len_bytes);
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::{AttrIter, NLA_HDRLEN};
    use crate::netlink::message::NLM_F_REQUEST;

    #[test]
    fn test_simple_message() {
        let msg = MessageBuilder::new(16, NLM_F_REQUEST).finish();
        assert_eq!(msg.len(), NLMSG_HDRLEN);

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, NLMSG_HDRLEN);
        assert_eq!(header.nlmsg_type, 16);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
    }

    #[test]
    fn test_attribute_padding() {
        let mut attrs = AttrBuilder::new();
        attrs.append_attr_u8(1, 0x20);
        assert_eq!(attrs.len(), 8);
        attrs.append_attr_u32(2, 0x12345678);
        assert_eq!(attrs.len(), 16);
    }

    #[test]
    fn test_nested_attribute() {
        let mut attrs = AttrBuilder::new();
        let nest = attrs.nest_start(1);
        attrs.append_attr_u32(2, 100);
        attrs.nest_end(nest);
        let data = attrs.finish();

        assert_eq!(data.len(), NLA_HDRLEN * 2 + 4);
        let (kind, payload) = AttrIter::new(&data).next().unwrap().unwrap();
        assert_eq!(kind, 1);
        let (inner, value) = AttrIter::new(payload).next().unwrap().unwrap();
        assert_eq!(inner, 2);
        assert_eq!(value, 100u32.to_ne_bytes());
    }

    #[test]
    fn test_append_nested_matches_nest_tokens() {
        let mut inner = AttrBuilder::new();
        inner.append_attr_u16(3, 51820);

        let mut a = AttrBuilder::new();
        a.append_nested(7, &inner);

        let mut b = AttrBuilder::new();
        let token = b.nest_start(7);
        b.append_attr_u16(3, 51820);
        b.nest_end(token);

        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_message_with_attrs() {
        let mut attrs = AttrBuilder::new();
        attrs.append_attr_str(2, "wg0");

        let mut builder = MessageBuilder::new(0x15, NLM_F_REQUEST);
        builder.append_attrs(attrs.as_bytes());
        builder.set_seq(9);
        let msg = builder.finish();

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, msg.len());
        assert_eq!(header.nlmsg_seq, 9);
        assert_eq!(&msg[NLMSG_HDRLEN..], attrs.as_bytes());
    }
}
