use serde::{Deserialize, Serialize};

use crate::bytes::WordReader;
use crate::Result;

use super::PacketType;

/// Integer-seconds timestamp type (TSI).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tsi {
    None,
    Utc,
    Gps,
    Other,
}

impl Tsi {
    fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Tsi::None,
            1 => Tsi::Utc,
            2 => Tsi::Gps,
            _ => Tsi::Other,
        }
    }
}

/// Fractional-seconds timestamp type (TSF).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tsf {
    None,
    SampleCount,
    /// Picoseconds since the integer timestamp.
    RealTime,
    FreeRunning,
}

impl Tsf {
    fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Tsf::None,
            1 => Tsf::SampleCount,
            2 => Tsf::RealTime,
            _ => Tsf::FreeRunning,
        }
    }
}

/// Class identifier words.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassId {
    pub pad_bit_count: u8,
    /// Organizationally unique identifier (24 bits)
    pub oui: u32,
    pub information_class_code: u16,
    pub packet_class_code: u16,
}

impl ClassId {
    fn from_u64(value: u64) -> Self {
        ClassId {
            pad_bit_count: (value >> 59 & 0x1f) as u8,
            oui: (value >> 32 & 0x00ff_ffff) as u32,
            information_class_code: (value >> 16 & 0xffff) as u16,
            packet_class_code: (value & 0xffff) as u16,
        }
    }
}

/// VITA 49 packet header.
///
/// The first word is common to all packets. All following fields are optional and
/// their presence is determined by flags in the first word, so the position of every
/// field depends on the fields before it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Header {
    pub packet_type: PacketType,
    pub has_class_id: bool,
    /// Data packets only; a 32-bit trailer ends the packet.
    pub trailer_present: bool,
    pub not_v49_0: bool,
    /// Signal spectrum data rather than signal time data.
    pub spectrum: bool,
    pub tsi: Tsi,
    pub tsf: Tsf,
    /// Rolling 4-bit packet count.
    pub packet_count: u8,
    /// Packet size in 32-bit words, including the header.
    pub packet_size: u16,
    pub stream_id: Option<u32>,
    pub class_id: Option<ClassId>,
    pub integer_timestamp: Option<u32>,
    pub fractional_timestamp: Option<u64>,
}

impl Header {
    /// Length of the first header word, the only fixed header field.
    pub const MIN_LEN: usize = 4;

    /// Decode only the first word of a header. No optional fields are decoded.
    #[must_use]
    pub fn from_word(word: u32) -> Self {
        Header {
            packet_type: PacketType::from(word >> 28 & 0xf),
            has_class_id: (word >> 27 & 0x1) == 1,
            trailer_present: (word >> 26 & 0x1) == 1,
            not_v49_0: (word >> 25 & 0x1) == 1,
            spectrum: (word >> 24 & 0x1) == 1,
            tsi: Tsi::from_bits(word >> 22),
            tsf: Tsf::from_bits(word >> 20),
            packet_count: (word >> 16 & 0xf) as u8,
            packet_size: (word & 0xffff) as u16,
            stream_id: None,
            class_id: None,
            integer_timestamp: None,
            fractional_timestamp: None,
        }
    }

    /// Decode a complete header from the start of `buf`.
    ///
    /// Returns the header and the number of bytes it occupied.
    ///
    /// # Errors
    /// [crate::Error::NotEnoughData] if `buf` ends before a field the header flags
    /// say is present.
    pub fn decode(buf: &[u8]) -> Result<(Header, usize)> {
        let mut r = WordReader::new(buf);
        let mut header = Header::from_word(r.read_u32()?);

        if header.packet_type.has_stream_id() {
            header.stream_id = Some(r.read_u32()?);
        }
        if header.has_class_id {
            header.class_id = Some(ClassId::from_u64(r.read_u64()?));
        }
        if header.tsi != Tsi::None {
            header.integer_timestamp = Some(r.read_u32()?);
        }
        if header.tsf != Tsf::None {
            header.fractional_timestamp = Some(r.read_u64()?);
        }

        Ok((header, r.position()))
    }

    /// Total packet length in bytes as declared by the size field.
    #[must_use]
    pub fn packet_len(&self) -> usize {
        self.packet_size as usize * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn decode_first_word() {
        // context, class id, UTC, real time, count 5, size 11
        let hdr = Header::from_word(0x4865_000b);
        assert_eq!(hdr.packet_type, PacketType::Context);
        assert!(hdr.has_class_id);
        assert!(!hdr.trailer_present);
        assert_eq!(hdr.tsi, Tsi::Utc);
        assert_eq!(hdr.tsf, Tsf::RealTime);
        assert_eq!(hdr.packet_count, 5);
        assert_eq!(hdr.packet_size, 11);
        assert_eq!(hdr.packet_len(), 44);
    }

    #[test]
    fn type_0_has_no_stream_id() {
        #[rustfmt::skip]
        let dat: &[u8] = &[
            0x00, 0x00, 0x00, 0x02,
            0xaa, 0xbb, 0xcc, 0xdd,
        ];
        let (hdr, len) = Header::decode(dat).unwrap();
        assert_eq!(hdr.packet_type, PacketType::SignalData);
        assert_eq!(hdr.stream_id, None);
        assert_eq!(len, 4);
    }

    #[test]
    fn type_1_reads_stream_id() {
        #[rustfmt::skip]
        let dat: &[u8] = &[
            0x14, 0x00, 0x00, 0x03,
            0x00, 0x00, 0x00, 0x01,
            0xaa, 0xbb, 0xcc, 0xdd,
        ];
        let (hdr, len) = Header::decode(dat).unwrap();
        assert_eq!(hdr.packet_type, PacketType::SignalDataWithStreamId);
        assert!(hdr.trailer_present);
        assert_eq!(hdr.stream_id, Some(1));
        assert_eq!(len, 8);
    }

    #[test]
    fn all_optional_fields() {
        #[rustfmt::skip]
        let dat: &[u8] = &[
            // context, class id, GPS, free running
            0x48, 0xb0, 0x00, 0x07,
            // stream id
            0x00, 0x00, 0x10, 0x01,
            // class id: pad 3, oui 0x123456, info 0x0001, packet 0x0002
            0x18, 0x12, 0x34, 0x56, 0x00, 0x01, 0x00, 0x02,
            // integer timestamp
            0x00, 0x00, 0x00, 0x10,
            // fractional timestamp
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20,
        ];
        let (hdr, len) = Header::decode(dat).unwrap();
        assert_eq!(len, 28);
        assert_eq!(hdr.stream_id, Some(0x1001));
        assert_eq!(
            hdr.class_id,
            Some(ClassId {
                pad_bit_count: 3,
                oui: 0x12_3456,
                information_class_code: 1,
                packet_class_code: 2,
            })
        );
        assert_eq!(hdr.tsi, Tsi::Gps);
        assert_eq!(hdr.tsf, Tsf::FreeRunning);
        assert_eq!(hdr.integer_timestamp, Some(16));
        assert_eq!(hdr.fractional_timestamp, Some(32));
    }

    #[test]
    fn truncated_header_fails() {
        // says integer timestamp follows, but it does not
        let dat: &[u8] = &[0x00, 0x40, 0x00, 0x02];
        let err = Header::decode(dat).unwrap_err();
        assert!(matches!(err, Error::NotEnoughData { .. }), "got {err:?}");

        assert!(Header::decode(&[0x00, 0x00]).is_err());
    }
}
