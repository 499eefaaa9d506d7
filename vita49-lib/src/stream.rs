//! Packet stream reading and conversion.
use std::io::Read;

use tracing::{debug, trace, warn};

use crate::bytes::Bytes;
use crate::convert::Converter;
use crate::correlation::ContextTable;
use crate::packet::{Body, Header, Packet};
use crate::summary::Summary;
use crate::{Error, Result};

/// Iterator of packets decoded from a byte stream. See [read_packets].
pub struct PacketReaderIter<R>
where
    R: Read,
{
    bytes: Bytes<R>,
    done: bool,
}

impl<R> PacketReaderIter<R>
where
    R: Read,
{
    fn new(reader: R) -> Self {
        PacketReaderIter {
            bytes: Bytes::new(reader),
            done: false,
        }
    }

    /// Read the raw bytes of the next packet, or `None` at end of stream.
    fn read_packet(&mut self) -> Result<Option<(usize, Vec<u8>)>> {
        let offset = self.bytes.offset();
        let mut first = [0u8; Header::MIN_LEN];
        if !self.bytes.fill(&mut first)? {
            if self.bytes.pending() > 0 {
                warn!(
                    offset,
                    leftover = self.bytes.pending(),
                    "not all data read; stream ended within a packet header"
                );
            }
            return Ok(None);
        }
        self.bytes.push(&first);

        let header = Header::from_word(u32::from_be_bytes(first));
        if header.packet_size == 0 {
            warn!(offset, "packet size of 0 words; cannot continue reading");
            return Ok(None);
        }
        let mut buf = vec![0u8; header.packet_len()];
        if !self.bytes.fill(&mut buf)? {
            warn!(
                offset,
                len = header.packet_len(),
                leftover = self.bytes.pending(),
                "not all data read; stream ended before end of packet"
            );
            return Ok(None);
        }
        Ok(Some((offset, buf)))
    }
}

impl<R> Iterator for PacketReaderIter<R>
where
    R: Read,
{
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (offset, buf) = match self.read_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        let result = Packet::decode(&buf).map(|mut packet| {
            packet.offset = offset;
            trace!(%packet, "decoded");
            packet
        });
        if let Err(err) = &result {
            debug!(offset, %err, "failed to decode packet");
        }
        Some(result)
    }
}

/// Decode packets from `reader`.
///
/// Each packet is delimited by the size in its first header word, so a packet that
/// fails to decode does not prevent decoding the packets that follow it. Iteration
/// ends at the end of the stream, if the stream ends part way through a packet, or if
/// a packet declares a size of 0. An I/O error reading the stream is produced as the
/// final item.
pub fn read_packets<R>(reader: R) -> PacketReaderIter<R>
where
    R: Read,
{
    PacketReaderIter::new(reader)
}

/// Convert all packets from `reader` to SigMF recordings.
///
/// Context packets are correlated with the data packets of their stream. Packets that
/// fail to decode are logged and counted in the returned summary and conversion
/// continues with the next packet.
///
/// # Errors
/// On I/O errors reading `reader` or writing the recordings.
pub fn convert<R>(reader: R, mut converter: Converter) -> Result<Summary>
where
    R: Read,
{
    let mut table = ContextTable::new();
    let mut summary = Summary::default();

    for result in read_packets(reader) {
        let packet = match result {
            Ok(packet) => packet,
            Err(Error::Io(err)) => return Err(Error::Io(err)),
            Err(err) => {
                warn!(%err, "skipping invalid packet");
                summary.add_error();
                continue;
            }
        };
        if let (Body::Context(context), Some(stream_id)) = (&packet.body, packet.stream_id()) {
            table.record(stream_id, packet.header, context.clone());
        }
        let samples = converter.convert(&packet, &table)?;
        summary.add(&packet, samples);
    }

    converter.finish()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn read_multiple() {
        #[rustfmt::skip]
        let dat = words(&[
            0x1000_0003, 1, 0,          // data
            0x5000_0002, 0xffff_ffff,   // extension context
            0x4000_0003, 1, 0,          // context
        ]);
        let packets: Vec<Packet> = read_packets(&dat[..]).map(Result::unwrap).collect();
        assert_eq!(packets.len(), 3);
        let offsets: Vec<usize> = packets.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
        assert_eq!(packets[1].body, Body::Skipped { len: 8 });
        assert!(packets[2].is_context());
    }

    #[test]
    fn invalid_packet_does_not_stop_reading() {
        #[rustfmt::skip]
        let dat = words(&[
            0x1000_0001, // size too small for the stream id
            0x0000_0002, 0,
        ]);
        let results: Vec<Result<Packet>> = read_packets(&dat[..]).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().offset, 4);
    }

    #[test]
    fn truncated_packet_ends_stream() {
        let mut dat = words(&[0x0000_0002, 0, 0x0000_0004, 0]);
        dat.push(0);
        let mut iter = read_packets(&dat[..]);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        // the partial packet is left over
        assert_eq!(iter.bytes.offset(), 8);
        assert_eq!(iter.bytes.pending(), 9);
    }

    #[test]
    fn truncated_header_is_left_over() {
        let mut dat = words(&[0x0000_0001]);
        dat.extend([0, 0]);
        let mut iter = read_packets(&dat[..]);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert_eq!(iter.bytes.pending(), 2);
    }

    #[test]
    fn zero_size_ends_stream() {
        let dat = words(&[0x0000_0000, 0x0000_0001]);
        assert_eq!(read_packets(&dat[..]).count(), 0);
    }

    #[test]
    fn empty_and_short_input() {
        assert_eq!(read_packets(&[0u8; 0][..]).count(), 0);
        assert_eq!(read_packets(&[0u8, 0][..]).count(), 0);
    }
}
