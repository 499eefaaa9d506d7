//! SigMF recording model.
//!
//! A recording is a `.sigmf-data` file of raw samples and a `.sigmf-meta` JSON document
//! describing it. Only the core namespace keys produced by the converter are modeled.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::Result;

/// Datatype of the data files written by the converter.
pub const DATATYPE_CF32_LE: &str = "cf32_le";
pub const SIGMF_VERSION: &str = "1.0.0";

pub const META_EXT: &str = "sigmf-meta";
pub const DATA_EXT: &str = "sigmf-data";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Global {
    #[serde(rename = "core:datatype")]
    pub datatype: String,
    #[serde(rename = "core:author")]
    pub author: String,
    #[serde(rename = "core:description")]
    pub description: String,
    #[serde(rename = "core:version")]
    pub version: String,
    #[serde(rename = "core:hw")]
    pub hw: String,
    #[serde(rename = "core:sample_rate")]
    pub sample_rate: f64,
}

/// A capture segment. Starts a new set of parameters at `sample_start`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Capture {
    #[serde(rename = "core:sample_start")]
    pub sample_start: u64,
    /// Center frequency in Hz
    #[serde(rename = "core:frequency")]
    pub frequency: f64,
    #[serde(rename = "core:datetime", skip_serializing_if = "Option::is_none", default)]
    pub datetime: Option<String>,
}

/// A `.sigmf-meta` document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Meta {
    pub global: Global,
    pub captures: Vec<Capture>,
    pub annotations: Vec<serde_json::Value>,
}

impl Meta {
    #[must_use]
    pub fn new(global: Global) -> Self {
        Meta {
            global,
            captures: Vec::default(),
            annotations: Vec::default(),
        }
    }

    /// Read a metadata document from `path`.
    ///
    /// # Errors
    /// On I/O errors or if the file is not a valid metadata document.
    pub fn read(path: &Path) -> Result<Meta> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write the document to `path`, replacing any existing file. Output is indented
    /// with 4 spaces.
    ///
    /// # Errors
    /// On I/O errors.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        let mut ser =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        writer.flush()?;
        Ok(())
    }
}

/// Write samples in `cf32_le` layout, returning the number of bytes written.
///
/// # Errors
/// On I/O errors.
pub fn write_cf32_le<W: Write>(writer: &mut W, samples: &[Complex32]) -> Result<usize> {
    let mut buf = Vec::with_capacity(samples.len() * 8);
    for s in samples {
        buf.extend_from_slice(&s.re.to_le_bytes());
        buf.extend_from_slice(&s.im.to_le_bytes());
    }
    writer.write_all(&buf)?;
    Ok(buf.len())
}

/// Read a `cf32_le` data file. A trailing partial sample is ignored.
///
/// # Errors
/// On I/O errors.
pub fn read_cf32_le(path: &Path) -> Result<Vec<Complex32>> {
    let dat = std::fs::read(path)?;
    Ok(dat
        .chunks_exact(8)
        .map(|b| {
            Complex32::new(
                f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                f32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            )
        })
        .collect())
}
