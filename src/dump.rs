//! Inspect the driver's segment without calibrating.
//! `elo-calibrate show` prints the record, `elo-calibrate dump` streams raw positions.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::record::{CalibrationRecord, Field};
use crate::segment::Segment;

pub fn run_show(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let segment = Segment::open(&config.segment, &config.inspect_options())?;
    let record = segment.read();
    segment.close();

    print!("{}", format_record(&record));
    Ok(())
}

fn format_record(record: &CalibrationRecord) -> String {
    Field::ALL
        .iter()
        .map(|&field| format!("{:>14}  {}\n", field.name(), record.get(field)))
        .collect()
}

pub fn run_dump(
    config: &Config,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let segment = Segment::open(&config.segment, &config.inspect_options())?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })?;

    eprintln!("Dumping raw positions from {} (Ctrl+C to stop):\n", segment.name());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut last = None;
    let mut n = 0u64;
    while running.load(Ordering::SeqCst) {
        let position = segment.raw_position();
        if last != Some(position) {
            n += 1;
            writeln!(out, "{:6}  x={}  y={}", n, position.0, position.1)?;
            out.flush()?;
            last = Some(position);
        }
        thread::sleep(interval);
    }

    log::debug!("Dump stopped after {} positions", n);
    segment.close();
    Ok(())
}
