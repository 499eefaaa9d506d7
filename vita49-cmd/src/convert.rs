use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use vita49::{ConvertOptions, Converter};

pub fn convert(input: &Path, opts: ConvertOptions) -> Result<()> {
    if !input.is_file() {
        bail!("{input:?} is not a file");
    }
    let reader = BufReader::new(File::open(input).context("opening input")?);
    info!("converting {input:?} to {:?}", opts.output_dir);

    let converter = Converter::new(opts).context("creating output directory")?;
    let summary = vita49::convert(reader, converter).context("converting packets")?;

    for (name, stream) in &summary.streams {
        if stream.context + stream.data == 0 {
            continue;
        }
        info!(
            "stream {name}: {} context, {} data, {} samples, {} missing",
            stream.context, stream.data, stream.samples, stream.missing
        );
    }
    if summary.errors > 0 {
        warn!("{} packets could not be decoded", summary.errors);
    }
    info!(
        "converted {} packets with {} samples",
        summary.count, summary.samples
    );
    Ok(())
}
