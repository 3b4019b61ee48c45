use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use traffi::dump::SnapshotDumper;
use traffi::settings::Settings;
use traffi::sink::{EventSink, HttpSink, NullSink};
use traffi::{Frame, TurnFilter, ZoneConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let settings = Settings::parse();

    let zones = Arc::new(ZoneConfig::open(&settings.zones));
    let _watcher = if settings.watch {
        Some(zones.watch().context("failed to watch boundary config")?)
    } else {
        None
    };

    let sink: Arc<dyn EventSink> = if settings.sink {
        Arc::new(HttpSink::new(settings.sink_config()).context("failed to start event sink")?)
    } else {
        Arc::new(NullSink)
    };

    let mut dumper = settings
        .dump_dir
        .as_ref()
        .map(|dir| SnapshotDumper::new(dir, settings.dump_interval))
        .transpose()
        .context("failed to prepare dump directory")?;

    let filter = TurnFilter::new(settings.filter_config(), zones, sink);

    let input: Box<dyn BufRead> = match &settings.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    let mut processed = 0u64;
    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read frame")?;
        if line.trim().is_empty() {
            continue;
        }

        let mut frame: Frame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(line = idx + 1, error = %err, "skipping malformed frame");
                continue;
            }
        };

        if let Some(dumper) = dumper.as_mut() {
            if let Err(err) = dumper.observe(&frame.detections) {
                warn!(error = %err, "detection dump failed");
            }
        }

        filter.process(&mut frame);
        processed += 1;

        serde_json::to_writer(&mut out, &frame)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(
        frames = processed,
        violations = filter.violation_count(),
        "input exhausted"
    );

    Ok(())
}
