//! VITA 49 packet decoding.
//!
//! Every packet starts with a [Header] whose first word gives the packet type and the
//! packet size in 32-bit words. Signal data packets (types 0 and 1) decode to [Data],
//! context packets (type 4) to [Context]. All other packet types are delimited by their
//! size but their contents are not decoded.
pub mod context;
pub mod data;
mod header;

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

pub use context::{Cif0Field, Context, FieldValue};
pub use data::{Data, SampleFormat, Trailer};
pub use header::{ClassId, Header, Tsf, Tsi};

/// Packet type from the first 4 bits of the header.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    SignalData,
    SignalDataWithStreamId,
    ExtensionData,
    ExtensionDataWithStreamId,
    Context,
    ExtensionContext,
    Command,
    ExtensionCommand,
    Reserved(u8),
}

impl From<u32> for PacketType {
    fn from(value: u32) -> Self {
        match value & 0xf {
            0 => Self::SignalData,
            1 => Self::SignalDataWithStreamId,
            2 => Self::ExtensionData,
            3 => Self::ExtensionDataWithStreamId,
            4 => Self::Context,
            5 => Self::ExtensionContext,
            6 => Self::Command,
            7 => Self::ExtensionCommand,
            v => Self::Reserved(v as u8),
        }
    }
}

impl PacketType {
    /// Only stream-id-bearing signal data (1) and context (4) packets are decoded
    /// with a stream identifier.
    #[must_use]
    pub fn has_stream_id(self) -> bool {
        matches!(self, Self::SignalDataWithStreamId | Self::Context)
    }

    /// Whether packets of this type have their body decoded.
    #[must_use]
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            Self::SignalData | Self::SignalDataWithStreamId | Self::Context
        )
    }
}

/// Decoded packet body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Body {
    Context(Context),
    Data(Data),
    /// Packet of an unsupported type; only its length is known.
    Skipped { len: usize },
}

/// A single VITA 49 packet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Packet {
    pub header: Header,
    pub body: Body,
    /// Byte offset of this packet in the source stream.
    pub offset: usize,
}

impl Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &self.body {
            Body::Context(ctx) => format!("context[fields={}]", ctx.fields.len()),
            Body::Data(data) => format!("data[len={}]", data.payload.len()),
            Body::Skipped { len } => format!("skipped[len={len}]"),
        };
        write!(
            f,
            "Packet{{type: {:?}, stream_id: {:?}, count: {}, offset: {}, {}}}",
            self.header.packet_type,
            self.header.stream_id,
            self.header.packet_count,
            self.offset,
            body
        )
    }
}

impl Packet {
    /// Decode a packet from the start of `buf`. Any bytes beyond the declared packet
    /// size are ignored.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if `buf` is shorter than the declared packet size or a
    /// field runs past the end of the packet, [Error::InvalidLength] if the declared
    /// size cannot hold the header.
    pub fn decode(buf: &[u8]) -> Result<Packet> {
        if buf.len() < Header::MIN_LEN {
            return Err(Error::NotEnoughData {
                actual: buf.len(),
                minimum: Header::MIN_LEN,
            });
        }
        let first = Header::from_word(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]));
        let packet_len = first.packet_len();
        if buf.len() < packet_len {
            return Err(Error::NotEnoughData {
                actual: buf.len(),
                minimum: packet_len,
            });
        }

        if !first.packet_type.is_supported() {
            debug!(packet_type = ?first.packet_type, len = packet_len, "skipping unsupported packet");
            return Ok(Packet {
                header: first,
                body: Body::Skipped { len: packet_len },
                offset: 0,
            });
        }

        let buf = &buf[..packet_len];
        let (header, header_len) = Header::decode(buf).map_err(|_| Error::InvalidLength {
            packet: packet_len,
            needed: implied_header_len(&first),
        })?;

        let body = if header.packet_type == PacketType::Context {
            let (context, len) = Context::decode(&buf[header_len..])?;
            let consumed = header_len + len;
            if consumed != packet_len {
                if context.higher_cifs.is_empty() {
                    warn!(
                        consumed,
                        packet_len, "context fields do not fill the packet"
                    );
                } else {
                    debug!(
                        consumed,
                        packet_len, "context packet has undecoded higher CIF fields"
                    );
                }
            }
            Body::Context(context)
        } else {
            Body::Data(Data::decode(&header, header_len, buf)?)
        };

        Ok(Packet {
            header,
            body,
            offset: 0,
        })
    }

    /// Stream identifier, `None` for packets that do not carry one.
    #[must_use]
    pub fn stream_id(&self) -> Option<u32> {
        self.header.stream_id
    }

    #[must_use]
    pub fn is_context(&self) -> bool {
        matches!(self.body, Body::Context(_))
    }
}

/// Header length implied by the flags of the first header word.
fn implied_header_len(first: &Header) -> usize {
    let mut len = Header::MIN_LEN;
    if first.packet_type.has_stream_id() {
        len += 4;
    }
    if first.has_class_id {
        len += 8;
    }
    if first.tsi != Tsi::None {
        len += 4;
    }
    if first.tsf != Tsf::None {
        len += 8;
    }
    len
}
