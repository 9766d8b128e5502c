//! Netlink attribute (nlattr) handling.

use super::error::{Error, Result};
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

/// Total aligned size of an attribute carrying `payload_len` bytes.
#[inline]
pub const fn nla_size(payload_len: usize) -> usize {
    nla_align(NLA_HDRLEN + payload_len)
}

/// Netlink attribute header (mirrors struct nlattr).
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
/// Yields `(type, payload)` pairs with the flag bits masked off. A header
/// whose length runs past the end of the buffer yields one error and ends
/// the iteration, so callers never see a silently shortened tree.
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Check if there are no more attributes.
    pub fn is_empty(&self) -> bool {
        self.data.len() < NLA_HDRLEN
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<(u16, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        // Trailing padding shorter than a header ends the stream.
        if self.data.len() < NLA_HDRLEN {
            return None;
        }

        let attr = match NlAttr::from_bytes(self.data) {
            Ok(a) => a,
            Err(e) => {
                self.data = &[];
                return Some(Err(e));
            }
        };

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN || len > self.data.len() {
            let remaining = self.data.len();
            self.data = &[];
            return Some(Err(Error::malformed(
                "attribute header",
                format!("length {} with {} bytes remaining", len, remaining),
            )));
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        // Move to next attribute
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some(Ok((attr.kind(), payload)))
    }
}

/// Helpers for extracting typed values from attribute payloads.
///
/// Fixed-size values must match their width exactly; anything else is a
/// [`Error::MalformedField`] naming `attr`.
pub mod get {
    use super::*;

    /// Copy a payload into a fixed-size array.
    pub fn array<const N: usize>(data: &[u8], attr: &'static str) -> Result<[u8; N]> {
        data.try_into().map_err(|_| {
            Error::malformed(attr, format!("expected {} bytes, got {}", N, data.len()))
        })
    }

    /// Extract a u8 value.
    pub fn u8(data: &[u8], attr: &'static str) -> Result<u8> {
        Ok(array::<1>(data, attr)?[0])
    }

    /// Extract a u16 value (native endian).
    pub fn u16_ne(data: &[u8], attr: &'static str) -> Result<u16> {
        Ok(u16::from_ne_bytes(array(data, attr)?))
    }

    /// Extract a u32 value (native endian).
    pub fn u32_ne(data: &[u8], attr: &'static str) -> Result<u32> {
        Ok(u32::from_ne_bytes(array(data, attr)?))
    }

    /// Extract a u64 value (native endian).
    pub fn u64_ne(data: &[u8], attr: &'static str) -> Result<u64> {
        Ok(u64::from_ne_bytes(array(data, attr)?))
    }

    /// Extract a null-terminated string.
    pub fn string<'a>(data: &'a [u8], attr: &'static str) -> Result<&'a str> {
        // Find null terminator or use whole buffer
        let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..len])
            .map_err(|e| Error::malformed(attr, format!("invalid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_masks_flags() {
        // len=8, type=NESTED|1, payload 4 bytes
        let data = [0x08, 0x00, 0x01, 0x80, 1, 2, 3, 4];
        let attrs: Vec<_> = AttrIter::new(&data).collect::<Result<_>>().unwrap();
        assert_eq!(attrs, vec![(1u16, &[1u8, 2, 3, 4][..])]);
    }

    #[test]
    fn test_iter_skips_padding() {
        // u8 attribute padded to 8 bytes, followed by a u16 attribute
        let data = [
            0x05, 0x00, 0x03, 0x00, 0x20, 0x00, 0x00, 0x00, //
            0x06, 0x00, 0x01, 0x00, 0x0a, 0x00, 0x00, 0x00,
        ];
        let attrs: Vec<_> = AttrIter::new(&data).collect::<Result<_>>().unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], (3, &[0x20u8][..]));
        assert_eq!(attrs[1].0, 1);
        assert_eq!(attrs[1].1.len(), 2);
    }

    #[test]
    fn test_iter_overrun_is_error() {
        // Claims 12 bytes, only 8 present
        let data = [0x0c, 0x00, 0x01, 0x00, 1, 2, 3, 4];
        let mut iter = AttrIter::new(&data);
        assert!(iter.next().unwrap().unwrap_err().is_malformed());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_get_exact_width() {
        assert_eq!(get::u16_ne(&7u16.to_ne_bytes(), "port").unwrap(), 7);
        assert!(get::u16_ne(&[1], "port").unwrap_err().is_malformed());
        assert!(get::u32_ne(&[0; 8], "mark").unwrap_err().is_malformed());
        assert!(get::u64_ne(&[0; 4], "rx").is_err());
        assert!(get::u8(&[], "cidr").is_err());
    }

    #[test]
    fn test_get_string() {
        assert_eq!(get::string(b"wg0\0", "ifname").unwrap(), "wg0");
        assert_eq!(get::string(b"wg1", "ifname").unwrap(), "wg1");
        assert!(get::string(&[0xff, 0xfe], "ifname").is_err());
    }
}
