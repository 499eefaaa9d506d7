//! Context packet payload decoding.
//!
//! Only CIF0 fields are interpreted. Enabled CIF1, CIF2, CIF3 and CIF7 indicator words
//! are consumed so CIF0 fields are found at the right offsets, but the content of those
//! higher CIF levels is left undecoded.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::bytes::{WordReader, WORD_LEN};
use crate::Result;

/// Radix of the 32-bit fixed-point fields.
const FIXED32_RADIX: f64 = (1u32 << 7) as f64;
/// Radix of the 64-bit fixed-point fields.
const FIXED64_RADIX: f64 = (1u64 << 20) as f64;

/// Fields defined by CIF0 that carry payload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Cif0Field {
    ReferencePointIdentifier,
    Bandwidth,
    IfReferenceFrequency,
    RfReferenceFrequency,
    RfReferenceFrequencyOffset,
    IfBandOffset,
    ReferenceLevel,
    Gain,
    OverRangeCount,
    SampleRate,
    TimestampAdjustment,
    TimestampCalibrationTime,
    Temperature,
    DeviceIdentifier,
    StateEventIndicators,
    SignalDataPayloadFormat,
    FormattedGps,
    FormattedIns,
    EcefEphemeris,
    RelativeEphemeris,
    EphemerisReferenceId,
    GpsAscii,
    ContextAssociationLists,
}

/// How a field is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Signed 32-bit fixed point, radix point after bit 7.
    Fixed32,
    /// Signed 64-bit fixed point, radix point after bit 20.
    Fixed64,
    Raw32,
    Raw64,
    Temperature,
    DeviceIdentifier,
    StateEventIndicators,
    PayloadFormat,
    /// Fixed number of words that are skipped.
    Words(usize),
    /// Array of records skipped using the word count found in the `size_word`th word
    /// of the field; `header_words` are the words not included in that count.
    Records {
        size_word: usize,
        header_words: usize,
    },
    ContextAssociationLists,
}

impl Cif0Field {
    /// The VITA 49.2 CIF0 bit that enables this field.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::ReferencePointIdentifier => 30,
            Self::Bandwidth => 29,
            Self::IfReferenceFrequency => 28,
            Self::RfReferenceFrequency => 27,
            Self::RfReferenceFrequencyOffset => 26,
            Self::IfBandOffset => 25,
            Self::ReferenceLevel => 24,
            Self::Gain => 23,
            Self::OverRangeCount => 22,
            Self::SampleRate => 21,
            Self::TimestampAdjustment => 20,
            Self::TimestampCalibrationTime => 19,
            Self::Temperature => 18,
            Self::DeviceIdentifier => 17,
            Self::StateEventIndicators => 16,
            Self::SignalDataPayloadFormat => 15,
            Self::FormattedGps => 14,
            Self::FormattedIns => 13,
            Self::EcefEphemeris => 12,
            Self::RelativeEphemeris => 11,
            Self::EphemerisReferenceId => 10,
            Self::GpsAscii => 9,
            Self::ContextAssociationLists => 8,
        }
    }

    #[must_use]
    pub const fn encoding(self) -> Encoding {
        match self {
            Self::TimestampCalibrationTime => Encoding::Raw32,
            Self::TimestampAdjustment => Encoding::Raw64,
            Self::ReferencePointIdentifier
            | Self::OverRangeCount
            | Self::EphemerisReferenceId
            | Self::ReferenceLevel
            | Self::Gain => Encoding::Fixed32,
            Self::Bandwidth
            | Self::IfReferenceFrequency
            | Self::RfReferenceFrequency
            | Self::RfReferenceFrequencyOffset
            | Self::IfBandOffset
            | Self::SampleRate => Encoding::Fixed64,
            Self::Temperature => Encoding::Temperature,
            Self::DeviceIdentifier => Encoding::DeviceIdentifier,
            Self::StateEventIndicators => Encoding::StateEventIndicators,
            Self::SignalDataPayloadFormat => Encoding::PayloadFormat,
            Self::FormattedGps | Self::FormattedIns | Self::RelativeEphemeris => {
                Encoding::Words(11)
            }
            Self::EcefEphemeris => Encoding::Words(13),
            Self::GpsAscii => Encoding::Records {
                size_word: 1,
                header_words: 2,
            },
            Self::ContextAssociationLists => Encoding::ContextAssociationLists,
        }
    }
}

/// Higher CIF levels that can be enabled from CIF0.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HigherCif {
    Cif1,
    Cif2,
    Cif3,
    Cif7,
}

/// Meaning of each CIF0 indicator bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    ChangeIndicator,
    Field(Cif0Field),
    Enable(HigherCif),
    Reserved,
}

/// CIF0 slots indexed by bit number.
pub const CIF0_SLOTS: [Slot; 32] = [
    Slot::Reserved,                 // 0
    Slot::Enable(HigherCif::Cif1),  // 1
    Slot::Enable(HigherCif::Cif2),  // 2
    Slot::Enable(HigherCif::Cif3),  // 3
    Slot::Reserved,                 // 4
    Slot::Reserved,                 // 5
    Slot::Reserved,                 // 6
    Slot::Enable(HigherCif::Cif7),  // 7
    Slot::Field(Cif0Field::ContextAssociationLists),
    Slot::Field(Cif0Field::GpsAscii),
    Slot::Field(Cif0Field::EphemerisReferenceId),
    Slot::Field(Cif0Field::RelativeEphemeris),
    Slot::Field(Cif0Field::EcefEphemeris),
    Slot::Field(Cif0Field::FormattedIns),
    Slot::Field(Cif0Field::FormattedGps),
    Slot::Field(Cif0Field::SignalDataPayloadFormat),
    Slot::Field(Cif0Field::StateEventIndicators),
    Slot::Field(Cif0Field::DeviceIdentifier),
    Slot::Field(Cif0Field::Temperature),
    Slot::Field(Cif0Field::TimestampCalibrationTime),
    Slot::Field(Cif0Field::TimestampAdjustment),
    Slot::Field(Cif0Field::SampleRate),
    Slot::Field(Cif0Field::OverRangeCount),
    Slot::Field(Cif0Field::Gain),
    Slot::Field(Cif0Field::ReferenceLevel),
    Slot::Field(Cif0Field::IfBandOffset),
    Slot::Field(Cif0Field::RfReferenceFrequencyOffset),
    Slot::Field(Cif0Field::RfReferenceFrequency),
    Slot::Field(Cif0Field::IfReferenceFrequency),
    Slot::Field(Cif0Field::Bandwidth),
    Slot::Field(Cif0Field::ReferencePointIdentifier),
    Slot::ChangeIndicator, // 31
];

/// Wire order of the higher CIF indicator words that follow CIF0.
const HIGHER_CIF_ORDER: [(u8, HigherCif); 4] = [
    (1, HigherCif::Cif1),
    (2, HigherCif::Cif2),
    (3, HigherCif::Cif3),
    (7, HigherCif::Cif7),
];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentifier {
    /// Manufacturer OUI (24 bits)
    pub oui: u32,
    pub device_code: u16,
}

impl DeviceIdentifier {
    fn decode(value: u64) -> Self {
        if value & 0xff00_0000_ffff_0000 != 0 {
            warn!("device identifier reserved bits are not 0: {value:#018x}");
        }
        DeviceIdentifier {
            oui: (value >> 32 & 0x00ff_ffff) as u32,
            device_code: (value & 0xffff) as u16,
        }
    }
}

/// State and event indicators. Each indicator is `None` unless its enable bit is set.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEventIndicators {
    pub calibrated_time: Option<bool>,
    pub valid_data: Option<bool>,
    pub reference_lock: Option<bool>,
    pub agc_mgc: Option<bool>,
    pub detected_signal: Option<bool>,
    pub spectral_inversion: Option<bool>,
    pub over_range: Option<bool>,
    pub sample_loss: Option<bool>,
    pub user_defined: u8,
}

/// Decode the indicator paired with enable bit `enable`. Indicators are 12 bits below
/// their enables.
pub(crate) fn indicator(value: u32, enable: u32) -> Option<bool> {
    if value >> enable & 1 == 1 {
        Some(value >> (enable - 12) & 1 == 1)
    } else {
        None
    }
}

impl StateEventIndicators {
    fn decode(value: u32) -> Self {
        StateEventIndicators {
            calibrated_time: indicator(value, 31),
            valid_data: indicator(value, 30),
            reference_lock: indicator(value, 29),
            agc_mgc: indicator(value, 28),
            detected_signal: indicator(value, 27),
            spectral_inversion: indicator(value, 26),
            over_range: indicator(value, 25),
            sample_loss: indicator(value, 24),
            user_defined: (value & 0xff) as u8,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealComplexType {
    Real,
    ComplexCartesian,
    ComplexPolar,
    Reserved,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataItemFormat {
    SignedFixedPoint,
    UnsignedFixedPoint,
    SignedFixedPointNonNormalized,
    SinglePrecisionFloatingPoint,
    Other(u8),
}

impl From<u8> for DataItemFormat {
    fn from(value: u8) -> Self {
        match value {
            0b0_0000 => Self::SignedFixedPoint,
            0b1_0000 => Self::UnsignedFixedPoint,
            0b0_0111 => Self::SignedFixedPointNonNormalized,
            0b0_1110 => Self::SinglePrecisionFloatingPoint,
            v => Self::Other(v),
        }
    }
}

/// Signal data packet payload format (VITA 49.2 9.13.3).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadFormat {
    /// `true` for link-efficient packing, `false` for processing-efficient.
    pub link_efficient: bool,
    pub real_complex_type: RealComplexType,
    pub data_item_format: DataItemFormat,
    pub sample_component_repeat: bool,
    pub event_tag_size: u8,
    pub channel_tag_size: u8,
    pub data_item_fraction_size: u8,
    /// Item packing field size in bits.
    pub item_packing_field_size: u8,
    /// Data item size in bits.
    pub data_item_size: u8,
    pub repeat_count: u16,
    pub vector_size: u16,
}

impl PayloadFormat {
    fn decode(value: u64) -> Self {
        let word = (value >> 32) as u32;
        let real_complex_type = match word >> 29 & 0x3 {
            0 => RealComplexType::Real,
            1 => RealComplexType::ComplexCartesian,
            2 => RealComplexType::ComplexPolar,
            _ => RealComplexType::Reserved,
        };
        if real_complex_type != RealComplexType::ComplexCartesian {
            warn!(
                ?real_complex_type,
                "sample format not supported; only complex cartesian is supported"
            );
        }
        PayloadFormat {
            link_efficient: word >> 31 == 1,
            real_complex_type,
            data_item_format: DataItemFormat::from((word >> 24 & 0x1f) as u8),
            sample_component_repeat: (word >> 23 & 0x1) == 1,
            event_tag_size: (word >> 20 & 0x7) as u8,
            channel_tag_size: (word >> 16 & 0xf) as u8,
            data_item_fraction_size: (word >> 12 & 0xf) as u8,
            // sizes are encoded as one less than the actual size
            item_packing_field_size: (word >> 6 & 0x3f) as u8 + 1,
            data_item_size: (word & 0x3f) as u8 + 1,
            repeat_count: (value >> 16 & 0xffff) as u16,
            vector_size: (value & 0xffff) as u16,
        }
    }
}

/// A decoded CIF0 field value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Fixed(f64),
    Raw32(u32),
    Raw64(u64),
    Temperature(f64),
    DeviceIdentifier(DeviceIdentifier),
    StateEventIndicators(StateEventIndicators),
    PayloadFormat(PayloadFormat),
    /// Field was present but intentionally not decoded.
    Unparsed { bytes: usize },
}

/// Decoded context packet payload.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Context {
    /// Raw CIF0 indicator word.
    pub cif0: u32,
    pub change_indicator: bool,
    /// Higher CIF indicator words, in wire order. Their fields are not decoded.
    pub higher_cifs: Vec<(HigherCif, u32)>,
    pub fields: BTreeMap<Cif0Field, FieldValue>,
}

fn fixed32(raw: u32) -> f64 {
    f64::from(raw as i32) / FIXED32_RADIX
}

fn fixed64(raw: u64) -> f64 {
    (raw as i64) as f64 / FIXED64_RADIX
}

/// Skip an array of records whose word count is stored in the field itself.
fn skip_records(r: &mut WordReader, size_word: usize, header_words: usize) -> Result<usize> {
    let words = r.peek_u32(size_word)? as usize;
    let len = (words + header_words) * WORD_LEN;
    r.skip(len)?;
    Ok(len)
}

/// Skip a context association lists field, sized by its two header words.
fn skip_association_lists(r: &mut WordReader) -> Result<usize> {
    let first = r.peek_u32(0)?;
    let second = r.peek_u32(1)?;
    let source = (first >> 16 & 0x1ff) as usize;
    let system = (first & 0x1ff) as usize;
    let vector_component = (second >> 16 & 0xffff) as usize;
    let asynchronous = (second & 0x7fff) as usize;
    // Asynchronous channel tag list is the same size as the channel list when present.
    let tags = if second >> 15 & 1 == 1 {
        asynchronous
    } else {
        0
    };
    let len = (2 + source + system + vector_component + asynchronous + tags) * WORD_LEN;
    r.skip(len)?;
    Ok(len)
}

fn decode_field(r: &mut WordReader, field: Cif0Field) -> Result<FieldValue> {
    let value = match field.encoding() {
        Encoding::Fixed32 => FieldValue::Fixed(fixed32(r.read_u32()?)),
        Encoding::Fixed64 => FieldValue::Fixed(fixed64(r.read_u64()?)),
        Encoding::Raw32 => FieldValue::Raw32(r.read_u32()?),
        Encoding::Raw64 => FieldValue::Raw64(r.read_u64()?),
        Encoding::Temperature => {
            let raw = r.read_u32()?;
            if raw >> 16 != 0 {
                warn!(raw, "temperature reserved bits are not 0");
            }
            FieldValue::Temperature(f64::from(raw as u16) / FIXED32_RADIX)
        }
        Encoding::DeviceIdentifier => {
            FieldValue::DeviceIdentifier(DeviceIdentifier::decode(r.read_u64()?))
        }
        Encoding::StateEventIndicators => {
            FieldValue::StateEventIndicators(StateEventIndicators::decode(r.read_u32()?))
        }
        Encoding::PayloadFormat => FieldValue::PayloadFormat(PayloadFormat::decode(r.read_u64()?)),
        Encoding::Words(words) => {
            r.skip(words * WORD_LEN)?;
            FieldValue::Unparsed {
                bytes: words * WORD_LEN,
            }
        }
        Encoding::Records {
            size_word,
            header_words,
        } => FieldValue::Unparsed {
            bytes: skip_records(r, size_word, header_words)?,
        },
        Encoding::ContextAssociationLists => FieldValue::Unparsed {
            bytes: skip_association_lists(r)?,
        },
    };
    Ok(value)
}

impl Context {
    /// Decode a context payload from the bytes following the header.
    ///
    /// Returns the context and the number of bytes consumed.
    ///
    /// # Errors
    /// [crate::Error::NotEnoughData] if the CIF0 indicator or any enabled field does
    /// not fit in `buf`.
    pub fn decode(buf: &[u8]) -> Result<(Context, usize)> {
        let mut r = WordReader::new(buf);
        let cif0 = r.read_u32()?;
        let mut context = Context {
            cif0,
            ..Default::default()
        };

        // Higher CIF indicator words directly follow CIF0 and precede all CIF0 fields
        for (bit, cif) in HIGHER_CIF_ORDER {
            if cif0 >> bit & 1 == 1 {
                warn!(?cif, "higher CIF level enabled; its fields will not be interpreted");
                context.higher_cifs.push((cif, r.read_u32()?));
            }
        }

        for bit in (0..32u8).rev() {
            if cif0 >> bit & 1 == 0 {
                continue;
            }
            match CIF0_SLOTS[bit as usize] {
                Slot::ChangeIndicator => context.change_indicator = true,
                Slot::Enable(_) => {}
                Slot::Reserved => warn!(bit, "reserved CIF0 bit set; invalid packet structure"),
                Slot::Field(field) => {
                    let value = decode_field(&mut r, field)?;
                    trace!(?field, ?value, "context field");
                    context.fields.insert(field, value);
                }
            }
        }

        Ok((context, r.position()))
    }

    #[must_use]
    pub fn get(&self, field: Cif0Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    fn fixed(&self, field: Cif0Field) -> Option<f64> {
        match self.get(field) {
            Some(FieldValue::Fixed(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> Option<f64> {
        self.fixed(Cif0Field::SampleRate)
    }

    #[must_use]
    pub fn bandwidth(&self) -> Option<f64> {
        self.fixed(Cif0Field::Bandwidth)
    }

    #[must_use]
    pub fn if_reference_frequency(&self) -> Option<f64> {
        self.fixed(Cif0Field::IfReferenceFrequency)
    }

    #[must_use]
    pub fn rf_reference_frequency(&self) -> Option<f64> {
        self.fixed(Cif0Field::RfReferenceFrequency)
    }

    /// Center frequency: the IF reference frequency, else the RF reference frequency.
    #[must_use]
    pub fn center_frequency(&self) -> Option<f64> {
        self.if_reference_frequency()
            .or_else(|| self.rf_reference_frequency())
    }

    #[must_use]
    pub fn payload_format(&self) -> Option<&PayloadFormat> {
        match self.get(Cif0Field::SignalDataPayloadFormat) {
            Some(FieldValue::PayloadFormat(fmt)) => Some(fmt),
            _ => None,
        }
    }
}
