#![allow(dead_code)]
use std::path::PathBuf;

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

pub const TSI_UTC: u32 = 1;
pub const TSI_GPS: u32 = 2;
pub const TSF_REAL_TIME: u32 = 2;

/// Encode a value as a 64-bit fixed point context field with 20 fractional bits.
pub fn fixed64(value: f64) -> [u32; 2] {
    let raw = (value * f64::from(1u32 << 20)) as i64 as u64;
    [(raw >> 32) as u32, raw as u32]
}

/// Payload format words for complex cartesian samples.
pub fn payload_format(data_item_format: u32, item_size: u32) -> [u32; 2] {
    let word = 1 << 29 | data_item_format << 24 | (item_size - 1) << 6 | (item_size - 1);
    [word, 0]
}

/// CIF0 fields to include in a context packet, in any order.
#[derive(Default, Clone)]
pub struct ContextFields {
    pub if_reference_frequency: Option<f64>,
    pub rf_reference_frequency: Option<f64>,
    pub sample_rate: Option<f64>,
    pub payload_format: Option<[u32; 2]>,
}

impl ContextFields {
    pub fn words(&self) -> Vec<u32> {
        let mut cif0 = 0u32;
        let mut words = Vec::new();
        if let Some(freq) = self.if_reference_frequency {
            cif0 |= 1 << 28;
            words.extend(fixed64(freq));
        }
        if let Some(freq) = self.rf_reference_frequency {
            cif0 |= 1 << 27;
            words.extend(fixed64(freq));
        }
        if let Some(rate) = self.sample_rate {
            cif0 |= 1 << 21;
            words.extend(fixed64(rate));
        }
        if let Some(fmt) = self.payload_format {
            cif0 |= 1 << 15;
            words.extend(fmt);
        }
        words.insert(0, cif0);
        words
    }
}

/// Builds the bytes of a single packet.
#[derive(Default, Clone)]
pub struct PacketBuilder {
    packet_type: u32,
    count: u32,
    stream_id: Option<u32>,
    tsi: u32,
    tsf: u32,
    integer_timestamp: u32,
    fractional_timestamp: u64,
    trailer: Option<u32>,
    body: Vec<u8>,
}

impl PacketBuilder {
    pub fn data(stream_id: Option<u32>) -> Self {
        PacketBuilder {
            packet_type: u32::from(stream_id.is_some()),
            stream_id,
            ..Default::default()
        }
    }

    pub fn context(stream_id: u32, fields: &ContextFields) -> Self {
        PacketBuilder {
            packet_type: 4,
            stream_id: Some(stream_id),
            ..Default::default()
        }
        .words(&fields.words())
    }

    /// A packet of any type whose body is not a valid packet body.
    pub fn other(packet_type: u32, body_words: usize) -> Self {
        PacketBuilder {
            packet_type,
            body: vec![0xff; body_words * 4],
            ..Default::default()
        }
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn timestamp(mut self, tsi: u32, tsf: u32, integer: u32, fractional: u64) -> Self {
        self.tsi = tsi;
        self.tsf = tsf;
        self.integer_timestamp = integer;
        self.fractional_timestamp = fractional;
        self
    }

    pub fn trailer(mut self, word: u32) -> Self {
        self.trailer = Some(word);
        self
    }

    pub fn words(mut self, words: &[u32]) -> Self {
        self.body.extend(words.iter().flat_map(|w| w.to_be_bytes()));
        self
    }

    pub fn iq_i16(mut self, samples: &[(i16, i16)]) -> Self {
        for (i, q) in samples {
            self.body.extend(i.to_be_bytes());
            self.body.extend(q.to_be_bytes());
        }
        self
    }

    pub fn bytes(mut self, dat: &[u8]) -> Self {
        self.body.extend_from_slice(dat);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut rest = Vec::new();
        if let Some(id) = self.stream_id {
            rest.extend(id.to_be_bytes());
        }
        if self.tsi != 0 {
            rest.extend(self.integer_timestamp.to_be_bytes());
        }
        if self.tsf != 0 {
            rest.extend(self.fractional_timestamp.to_be_bytes());
        }
        rest.extend(&self.body);
        if let Some(trailer) = self.trailer {
            rest.extend(trailer.to_be_bytes());
        }
        assert_eq!(rest.len() % 4, 0, "packet body must be whole words");

        let size = (rest.len() / 4 + 1) as u32;
        let word = self.packet_type << 28
            | u32::from(self.trailer.is_some()) << 26
            | self.tsi << 22
            | self.tsf << 20
            | (self.count & 0xf) << 16
            | size;
        let mut dat = word.to_be_bytes().to_vec();
        dat.extend(rest);
        dat
    }
}

/// Concatenate packets into a single stream.
pub fn stream(packets: &[PacketBuilder]) -> Vec<u8> {
    packets.iter().flat_map(PacketBuilder::build).collect()
}
