use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

use super::context::{indicator, Context, DataItemFormat};
use super::Header;

/// Full scale of a 16-bit signed sample. Samples of every width are normalized by it.
// TODO: scale 32-bit and unsigned samples by their own full scale.
const FULL_SCALE: f32 = 32767.0;

/// Data packet trailer.
///
/// Each indicator is `None` unless its enable bit is set.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub calibrated_time: Option<bool>,
    pub valid_data: Option<bool>,
    pub reference_lock: Option<bool>,
    pub agc_mgc: Option<bool>,
    pub detected_signal: Option<bool>,
    pub spectral_inversion: Option<bool>,
    pub over_range: Option<bool>,
    pub sample_loss: Option<bool>,
    pub sample_frame: Option<bool>,
    pub user_defined: [Option<bool>; 3],
    /// Set when `associated_context_packets` is valid.
    pub e: bool,
    pub associated_context_packets: u8,
}

impl From<u32> for Trailer {
    fn from(value: u32) -> Self {
        Trailer {
            calibrated_time: indicator(value, 31),
            valid_data: indicator(value, 30),
            reference_lock: indicator(value, 29),
            agc_mgc: indicator(value, 28),
            detected_signal: indicator(value, 27),
            spectral_inversion: indicator(value, 26),
            over_range: indicator(value, 25),
            sample_loss: indicator(value, 24),
            sample_frame: indicator(value, 23),
            user_defined: [
                indicator(value, 22),
                indicator(value, 21),
                indicator(value, 20),
            ],
            e: value >> 7 & 1 == 1,
            associated_context_packets: (value & 0x7f) as u8,
        }
    }
}

/// Signal data packet body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Data {
    /// Payload bytes exactly as found in the packet.
    pub payload: Vec<u8>,
    pub trailer: Option<Trailer>,
}

impl Data {
    /// Decode the body of a data packet. `buf` is the complete packet and `header_len`
    /// the number of bytes occupied by `header`.
    ///
    /// # Errors
    /// [Error::InvalidLength] if the declared packet size is too small to hold the
    /// header and trailer, [Error::NotEnoughData] if `buf` is shorter than the declared
    /// packet size.
    pub fn decode(header: &Header, header_len: usize, buf: &[u8]) -> Result<Data> {
        let packet_len = header.packet_len();
        let trailer_len = if header.trailer_present { 4 } else { 0 };
        let needed = header_len + trailer_len;
        if packet_len < needed {
            return Err(Error::InvalidLength {
                packet: packet_len,
                needed,
            });
        }
        if buf.len() < packet_len {
            return Err(Error::NotEnoughData {
                actual: buf.len(),
                minimum: packet_len,
            });
        }

        let payload_end = packet_len - trailer_len;
        let trailer = if header.trailer_present {
            let b = &buf[payload_end..packet_len];
            Some(Trailer::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
        } else {
            None
        };

        Ok(Data {
            payload: buf[header_len..payload_end].to_vec(),
            trailer,
        })
    }

    /// Interpret the payload as interleaved I/Q samples of the given format.
    ///
    /// Trailing bytes that do not make up a complete I/Q pair are ignored.
    #[must_use]
    pub fn samples(&self, format: SampleFormat) -> Vec<Complex32> {
        let width = format.width();
        self.payload
            .chunks_exact(width * 2)
            .map(|pair| {
                let (i, q) = pair.split_at(width);
                Complex32::new(format.value(i), format.value(q)) / FULL_SCALE
            })
            .collect()
    }
}

/// Wire representation of a single sample component.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    I16Be,
    U16Be,
    I32Be,
    F32Be,
}

impl SampleFormat {
    /// Choose the sample format described by a context's payload format.
    ///
    /// Without a context, or a context lacking a payload format, samples are assumed
    /// to be 16-bit signed integers.
    #[must_use]
    pub fn for_context(context: Option<&Context>) -> Self {
        let Some(fmt) = context.and_then(Context::payload_format) else {
            return Self::default();
        };
        match fmt.data_item_format {
            DataItemFormat::UnsignedFixedPoint => Self::U16Be,
            DataItemFormat::SignedFixedPoint if fmt.data_item_size == 32 => Self::I32Be,
            DataItemFormat::SignedFixedPoint => Self::I16Be,
            DataItemFormat::SinglePrecisionFloatingPoint => {
                warn!("single precision floating point samples are not fully supported");
                Self::F32Be
            }
            DataItemFormat::SignedFixedPointNonNormalized => {
                warn!("signed fixed point non-normalized samples are not fully supported");
                Self::I16Be
            }
            DataItemFormat::Other(code) => {
                warn!(code, "unsupported data item format; assuming 32-bit float");
                Self::F32Be
            }
        }
    }

    /// Bytes per sample component.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::I16Be | Self::U16Be => 2,
            Self::I32Be | Self::F32Be => 4,
        }
    }

    // Caller guarantees `b` is exactly `width()` bytes.
    fn value(self, b: &[u8]) -> f32 {
        match self {
            Self::I16Be => f32::from(i16::from_be_bytes([b[0], b[1]])),
            Self::U16Be => f32::from(u16::from_be_bytes([b[0], b[1]])),
            Self::I32Be => i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f32,
            Self::F32Be => f32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        }
    }
}
