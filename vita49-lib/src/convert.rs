//! Incremental conversion of decoded packets to SigMF recordings.
//!
//! Every stream gets its own recording named after its stream identifier. A capture
//! segment is appended for every context and data packet of the stream, so a reader
//! of the recording can follow changes in frequency and time.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::correlation::{ContextTable, Correlated};
use crate::packet::{Body, Packet, SampleFormat};
use crate::sigmf::{
    write_cf32_le, Capture, Global, Meta, DATATYPE_CF32_LE, DATA_EXT, META_EXT, SIGMF_VERSION,
};
use crate::timestamp::capture_datetime;
use crate::Result;

/// Options for a [Converter].
#[derive(TypedBuilder, Debug, Clone)]
pub struct ConvertOptions {
    /// Directory recordings are written to. Created if it does not exist.
    #[builder(setter(into))]
    pub output_dir: PathBuf,
    #[builder(default = String::from("unknown"), setter(into))]
    pub author: String,
    #[builder(default = String::from("Converted from VITA 49"), setter(into))]
    pub description: String,
    /// Hardware description.
    #[builder(default = String::from("unknown"), setter(into))]
    pub hw: String,
    /// Write metadata files once in [Converter::finish] rather than after every packet.
    #[builder(default)]
    pub defer_metadata: bool,
}

/// File name stem for a stream. Packets without a stream identifier share the stream
/// named `none`.
#[must_use]
pub fn stream_name(stream_id: Option<u32>) -> String {
    match stream_id {
        Some(id) => format!("{id:#x}"),
        None => "none".to_string(),
    }
}

struct StreamOutput {
    meta: Meta,
    meta_path: PathBuf,
    data: BufWriter<File>,
    /// Number of samples written so far.
    sample_start: u64,
}

fn recording_path(dir: &Path, stream_id: Option<u32>, ext: &str) -> PathBuf {
    dir.join(format!("{}.{ext}", stream_name(stream_id)))
}

impl StreamOutput {
    fn create(
        opts: &ConvertOptions,
        stream_id: Option<u32>,
        correlated: Option<&Correlated>,
    ) -> Result<Self> {
        let data_path = recording_path(&opts.output_dir, stream_id, DATA_EXT);
        debug!(path = %data_path.display(), "creating recording");
        // Truncates data left by a previous run since samples are only ever appended.
        let data = BufWriter::new(File::create(&data_path)?);

        let sample_rate = match correlated.and_then(|c| c.context.sample_rate()) {
            Some(rate) => rate,
            None => {
                warn!(stream = %stream_name(stream_id), "no sample rate given; using 0");
                0.0
            }
        };
        let meta = Meta::new(Global {
            datatype: DATATYPE_CF32_LE.to_string(),
            author: opts.author.clone(),
            description: opts.description.clone(),
            version: SIGMF_VERSION.to_string(),
            hw: opts.hw.clone(),
            sample_rate,
        });

        Ok(StreamOutput {
            meta,
            meta_path: recording_path(&opts.output_dir, stream_id, META_EXT),
            data,
            sample_start: 0,
        })
    }

    fn persist(&mut self) -> Result<()> {
        self.data.flush()?;
        self.meta.write(&self.meta_path)
    }
}

/// Writes decoded packets to SigMF recordings, one per stream.
///
/// The data file of every stream stays open until [Converter::finish], so a capture
/// can hold at most as many streams as the process may have open files.
pub struct Converter {
    opts: ConvertOptions,
    streams: HashMap<Option<u32>, StreamOutput>,
}

impl Converter {
    /// # Errors
    /// If the output directory cannot be created.
    pub fn new(opts: ConvertOptions) -> Result<Self> {
        fs::create_dir_all(&opts.output_dir)?;
        Ok(Converter {
            opts,
            streams: HashMap::default(),
        })
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.opts.output_dir
    }

    /// Path of the file with extension `ext` for a stream.
    #[must_use]
    pub fn stream_path(&self, stream_id: Option<u32>, ext: &str) -> PathBuf {
        recording_path(&self.opts.output_dir, stream_id, ext)
    }

    /// Add a packet to its stream's recording, returning the number of samples written.
    ///
    /// `table` must already include `packet` if it is a context packet. Packets of
    /// unsupported types are ignored.
    ///
    /// # Errors
    /// On I/O errors writing the recording.
    pub fn convert(&mut self, packet: &Packet, table: &ContextTable) -> Result<usize> {
        if let Body::Skipped { .. } = packet.body {
            return Ok(0);
        }
        let stream_id = packet.stream_id();
        let correlated = stream_id.and_then(|id| table.lookup(id));

        let output = match self.streams.entry(stream_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(StreamOutput::create(&self.opts, stream_id, correlated)?)
            }
        };

        let frequency = match correlated.and_then(|c| c.context.center_frequency()) {
            Some(freq) => freq,
            None => {
                warn!(stream = %stream_name(stream_id), "no center frequency given; using 0");
                0.0
            }
        };
        let capture = Capture {
            sample_start: output.sample_start,
            frequency,
            datetime: correlated.and_then(|c| capture_datetime(&c.header)),
        };

        let mut num_samples = 0;
        if let Body::Data(data) = &packet.body {
            if correlated.is_none() {
                debug!(
                    stream = %stream_name(stream_id),
                    "no context for data packet; assuming 16-bit signed samples"
                );
            }
            let samples = data.samples(SampleFormat::for_context(correlated.map(|c| &c.context)));
            write_cf32_le(&mut output.data, &samples)?;
            num_samples = samples.len();
            output.sample_start += num_samples as u64;
        }

        output.meta.captures.push(capture);
        if !self.opts.defer_metadata {
            output.persist()?;
        }
        Ok(num_samples)
    }

    /// Flush all recordings, writing any deferred metadata.
    ///
    /// # Errors
    /// On I/O errors writing the recordings.
    pub fn finish(mut self) -> Result<()> {
        for output in self.streams.values_mut() {
            output.persist()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Cif0Field, Context, Data, FieldValue, Header};

    #[test]
    fn stream_names() {
        assert_eq!(stream_name(Some(0x1f)), "0x1f");
        assert_eq!(stream_name(Some(0)), "0x0");
        assert_eq!(stream_name(None), "none");
    }

    fn data_packet(stream_id: Option<u32>, payload: Vec<u8>) -> Packet {
        let word = if stream_id.is_some() { 0x1000_0000 } else { 0 };
        let mut header = Header::from_word(word);
        header.stream_id = stream_id;
        Packet {
            header,
            body: Body::Data(Data {
                payload,
                trailer: None,
            }),
            offset: 0,
        }
    }

    #[test]
    fn data_without_context() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ConvertOptions::builder().output_dir(dir.path()).build();
        let mut conv = Converter::new(opts).unwrap();
        let table = ContextTable::new();

        let packet = data_packet(None, vec![0x7f, 0xff, 0x00, 0x00]);
        assert_eq!(conv.convert(&packet, &table).unwrap(), 1);
        assert_eq!(conv.convert(&packet, &table).unwrap(), 1);
        conv.finish().unwrap();

        let meta = Meta::read(&dir.path().join("none.sigmf-meta")).unwrap();
        assert_eq!(meta.global.sample_rate, 0.0);
        assert_eq!(meta.global.author, "unknown");
        let starts: Vec<u64> = meta.captures.iter().map(|c| c.sample_start).collect();
        assert_eq!(starts, vec![0, 1]);
        assert!(meta.captures.iter().all(|c| c.frequency == 0.0));

        let data = std::fs::read(dir.path().join("none.sigmf-data")).unwrap();
        assert_eq!(data.len(), 16);
        assert_eq!(&data[..4], &1.0f32.to_le_bytes());
    }

    #[test]
    fn context_sets_rate_and_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ConvertOptions::builder()
            .output_dir(dir.path())
            .author("tester")
            .build();
        let mut conv = Converter::new(opts).unwrap();
        let mut table = ContextTable::new();

        let mut context = Context::default();
        context
            .fields
            .insert(Cif0Field::SampleRate, FieldValue::Fixed(2e6));
        context
            .fields
            .insert(Cif0Field::RfReferenceFrequency, FieldValue::Fixed(433e6));
        let mut header = Header::from_word(0x4000_0000);
        header.stream_id = Some(5);
        table.record(5, header, context.clone());
        let ctx_packet = Packet {
            header,
            body: Body::Context(context),
            offset: 0,
        };

        assert_eq!(conv.convert(&ctx_packet, &table).unwrap(), 0);
        assert_eq!(
            conv.convert(&data_packet(Some(5), vec![0; 8]), &table)
                .unwrap(),
            2
        );
        assert_eq!(conv.convert(&ctx_packet, &table).unwrap(), 0);

        // metadata is current without finishing
        let meta = Meta::read(&conv.stream_path(Some(5), META_EXT)).unwrap();
        assert_eq!(meta.global.sample_rate, 2e6);
        assert_eq!(meta.global.author, "tester");
        let starts: Vec<u64> = meta.captures.iter().map(|c| c.sample_start).collect();
        assert_eq!(starts, vec![0, 0, 2]);
        assert!(meta.captures.iter().all(|c| c.frequency == 433e6));
        assert!(meta.captures.iter().all(|c| c.datetime.is_none()));
    }

    #[test]
    fn skipped_packets_produce_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ConvertOptions::builder().output_dir(dir.path()).build();
        let mut conv = Converter::new(opts).unwrap();
        let packet = Packet {
            header: Header::from_word(0x5000_0002),
            body: Body::Skipped { len: 8 },
            offset: 0,
        };
        assert_eq!(conv.convert(&packet, &ContextTable::new()).unwrap(), 0);
        conv.finish().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn deferred_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ConvertOptions::builder()
            .output_dir(dir.path())
            .defer_metadata(true)
            .build();
        let mut conv = Converter::new(opts).unwrap();
        conv.convert(&data_packet(Some(1), vec![0; 4]), &ContextTable::new())
            .unwrap();

        let path = conv.stream_path(Some(1), META_EXT);
        assert!(!path.exists());
        conv.finish().unwrap();
        assert_eq!(Meta::read(&path).unwrap().captures.len(), 1);
    }

    #[test]
    fn failed_recording_is_not_kept() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ConvertOptions::builder().output_dir(dir.path()).build();
        let mut conv = Converter::new(opts).unwrap();
        let table = ContextTable::new();
        let packet = data_packet(Some(1), vec![0; 4]);

        // a directory in the way of the data file
        let data_path = conv.stream_path(Some(1), DATA_EXT);
        std::fs::create_dir(&data_path).unwrap();
        assert!(conv.convert(&packet, &table).is_err());

        std::fs::remove_dir(&data_path).unwrap();
        assert_eq!(conv.convert(&packet, &table).unwrap(), 1);
        conv.finish().unwrap();
        let meta = Meta::read(&recording_path(dir.path(), Some(1), META_EXT)).unwrap();
        assert_eq!(meta.captures.len(), 1);
    }

    #[test]
    fn recordings_stay_open_until_finish() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ConvertOptions::builder()
            .output_dir(dir.path())
            .defer_metadata(true)
            .build();
        let mut conv = Converter::new(opts).unwrap();
        let table = ContextTable::new();
        for id in 0..64 {
            conv.convert(&data_packet(Some(id), vec![0; 4]), &table)
                .unwrap();
        }
        assert_eq!(conv.streams.len(), 64);
        conv.finish().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 128);
    }
}
