use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::convert::stream_name;
use crate::packet::{Body, Context, Packet};

/// Largest value of the rolling 4-bit packet count.
pub const PACKET_COUNT_MAX: u8 = 15;

/// Number of packets missing between packet count `last` and `cur`, accounting for
/// rollover.
#[must_use]
pub fn missing_packets(cur: u8, last: u8) -> u8 {
    let expected = if last >= PACKET_COUNT_MAX { 0 } else { last + 1 };
    if cur == expected {
        return 0;
    }
    if last + 1 > cur {
        return cur + PACKET_COUNT_MAX - last;
    }
    cur - last - 1
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StreamSummary {
    pub count: usize,
    pub bytes: usize,
    pub context: usize,
    pub data: usize,
    pub skipped: usize,
    pub samples: usize,
    pub missing: usize,
    pub last_context: Option<Context>,
}

/// Tracks stats on packet iteration, per stream.
///
/// Streams are keyed by the same name used for their recordings. Packets of
/// unsupported types are not decoded past their first header word and are
/// counted under `none`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub bytes: usize,
    pub samples: usize,
    pub missing: usize,
    /// Packets that failed to decode or convert.
    pub errors: usize,
    pub streams: BTreeMap<String, StreamSummary>,

    // Packet counts are kept separately for context and data packets of a stream.
    #[serde(skip)]
    last_counts: HashMap<(Option<u32>, bool), u8>,
}

impl Summary {
    /// Add a packet and the number of samples converted from it.
    pub fn add(&mut self, packet: &Packet, samples: usize) {
        let len = packet.header.packet_len();
        self.count += 1;
        self.bytes += len;
        self.samples += samples;

        let stream_id = packet.stream_id();
        let stream = self.streams.entry(stream_name(stream_id)).or_default();
        stream.count += 1;
        stream.bytes += len;
        stream.samples += samples;

        let is_context = match &packet.body {
            Body::Context(ctx) => {
                stream.context += 1;
                stream.last_context = Some(ctx.clone());
                true
            }
            Body::Data(_) => {
                stream.data += 1;
                false
            }
            Body::Skipped { .. } => {
                stream.skipped += 1;
                return;
            }
        };

        let cur = packet.header.packet_count;
        if let Some(last) = self.last_counts.insert((stream_id, is_context), cur) {
            let missing = missing_packets(cur, last) as usize;
            stream.missing += missing;
            self.missing += missing;
        }
    }

    pub fn add_error(&mut self) {
        self.errors += 1;
    }
}
