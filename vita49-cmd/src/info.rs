use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{stdout, BufReader, Write},
    path::Path,
};
use tracing::debug;
use vita49::packet::SampleFormat;
use vita49::{read_packets, Body, ContextTable, Error, Summary};

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct StreamInfo {
    count: usize,
    bytes: usize,
    context: usize,
    data: usize,
    skipped: usize,
    samples: usize,
    missing: usize,
    sample_rate: Option<f64>,
    frequency: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    summary: Summary,
    streams: BTreeMap<String, StreamInfo>,
}

fn summarize(fpath: &Path) -> Result<Info> {
    let reader = BufReader::new(File::open(fpath).context("opening input")?);

    let mut table = ContextTable::new();
    let mut summary = Summary::default();
    for result in read_packets(reader) {
        let packet = match result {
            Ok(packet) => packet,
            Err(Error::Io(err)) => return Err(err).context("reading input"),
            Err(err) => {
                debug!("invalid packet: {err}");
                summary.add_error();
                continue;
            }
        };
        let samples = match (&packet.body, packet.stream_id()) {
            (Body::Context(context), Some(id)) => {
                table.record(id, packet.header, context.clone());
                0
            }
            (Body::Data(data), id) => {
                let context = id.and_then(|id| table.lookup(id)).map(|c| &c.context);
                let width = SampleFormat::for_context(context).width();
                data.payload.len() / (2 * width)
            }
            _ => 0,
        };
        summary.add(&packet, samples);
    }

    let streams = summary
        .streams
        .iter()
        .map(|(name, s)| {
            let context = s.last_context.as_ref();
            let info = StreamInfo {
                count: s.count,
                bytes: s.bytes,
                context: s.context,
                data: s.data,
                skipped: s.skipped,
                samples: s.samples,
                missing: s.missing,
                sample_rate: context.and_then(vita49::Context::sample_rate),
                frequency: context.and_then(vita49::Context::center_frequency),
            };
            (name.clone(), info)
        })
        .collect();

    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        summary,
        streams,
    })
}

pub fn info(fpath: &Path, format: &Format) -> Result<()> {
    let info = summarize(fpath)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => "-".to_string(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or_default().max(v.len());
        format!("{v:>num$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
=====================================================================================================
Packets:  {{ summary.count }}
Bytes:    {{ summary.bytes }}
Samples:  {{ summary.samples }}
Missing:  {{ summary.missing }}
Invalid:  {{ summary.errors }}
Streams:  {{ #each streams }}{{ @key }}{{ #if @last }}{{ else }}, {{ /if }}{{ /each }}
-----------------------------------------------------------------------------------------------------
Stream        Count  Context     Data  Skipped     Samples  Missing   Sample Rate         Frequency
-----------------------------------------------------------------------------------------------------
{{ #each streams }}{{ lpad 10 @key }}  {{ lpad 7 count }}  {{ lpad 7 context }}  {{ lpad 7 data }}  {{ lpad 7 skipped }}  {{ lpad 10 samples }}  {{ lpad 7 missing }}  {{ lpad 12 sample_rate }}  {{ lpad 16 frequency }}
{{/each }}
";
