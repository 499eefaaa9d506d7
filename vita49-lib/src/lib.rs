//! VITA 49 packet stream decoding and conversion to SigMF recordings.
//!
//! A VITA 49 stream is a sequence of self-delimiting packets. Context packets describe
//! a stream (frequencies, sample rate, payload format) and data packets carry the IQ
//! samples. [read_packets] decodes packets from any [std::io::Read], a [ContextTable]
//! correlates each data packet with the most recent context for its stream, and the
//! [Converter] writes one `.sigmf-data`/`.sigmf-meta` pair per stream.
//!
//! ```no_run
//! use std::fs::File;
//! use vita49::{convert, ConvertOptions, Converter};
//!
//! let reader = File::open("capture.vita49").unwrap();
//! let opts = ConvertOptions::builder().output_dir("out").build();
//! let summary = convert(reader, Converter::new(opts).unwrap()).unwrap();
//! println!("{} packets", summary.count);
//! ```
//!
//! References:
//! * ANSI/VITA 49.2-2017, VITA Radio Transport (VRT) Standard
//! * SigMF specification v1.0.0
mod error;

pub mod bytes;
pub mod convert;
pub mod correlation;
pub mod packet;
pub mod sigmf;
pub mod stream;
pub mod summary;
pub mod timestamp;

pub use convert::{ConvertOptions, Converter};
pub use correlation::{ContextTable, Correlated};
pub use error::{Error, Result};
pub use packet::{Body, Context, Data, Header, Packet, PacketType};
pub use stream::{convert, read_packets};
pub use summary::Summary;
