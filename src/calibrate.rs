//! One calibration run: collect four samples, fit, publish.

use std::io;

use crate::collect::{RawFeed, SampleSource, TerminalSource};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fit::{self, Sample};
use crate::geometry::{Corner, ScreenSize, ScreenTarget};
use crate::record::Bounds;
use crate::segment::Segment;

/// Where a calibration run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    AwaitingCorner(Corner),
    Fitting,
    Done(Bounds),
    Failed,
}

/// Ordered collection of the four samples and the fit that follows.
pub struct Calibration {
    screen: ScreenSize,
    targets: [ScreenTarget; 4],
    samples: Vec<Sample>,
    stage: Stage,
}

impl Calibration {
    pub fn new(screen: ScreenSize, inset: u32) -> Self {
        Self {
            screen,
            targets: screen.targets(inset),
            samples: Vec::with_capacity(Corner::ALL.len()),
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn target(&self, corner: Corner) -> ScreenTarget {
        self.targets[corner.index()]
    }

    pub fn start(&mut self) -> Result<Corner> {
        if self.stage != Stage::Idle {
            return Err(Error::OutOfSequence("run already started"));
        }
        self.stage = Stage::AwaitingCorner(Corner::TopLeft);
        Ok(Corner::TopLeft)
    }

    /// Record the sample for the corner being awaited. Returns the next
    /// corner, or `None` once all four are in.
    pub fn record(&mut self, sample: Sample) -> Result<Option<Corner>> {
        let Stage::AwaitingCorner(corner) = self.stage else {
            return Err(Error::OutOfSequence("no corner is awaiting a sample"));
        };
        self.samples.push(sample);

        self.stage = match corner.next() {
            Some(next) => Stage::AwaitingCorner(next),
            None => Stage::Fitting,
        };
        Ok(corner.next())
    }

    /// Give up on the run. Nothing has been written anywhere.
    pub fn abort(&mut self) {
        self.stage = Stage::Failed;
    }

    /// Fit the collected samples.
    pub fn finish(&mut self) -> Result<Bounds> {
        if self.stage != Stage::Fitting {
            return Err(Error::OutOfSequence("samples are not complete"));
        }
        let samples: [Sample; 4] = match self.samples.as_slice().try_into() {
            Ok(samples) => samples,
            Err(_) => {
                self.stage = Stage::Failed;
                let corner = Corner::ALL[self.samples.len().min(3)];
                return Err(Error::missing_sample(corner, "sample set incomplete"));
            }
        };

        match fit::fit(&samples, &self.targets, self.screen) {
            Ok(bounds) => {
                self.stage = Stage::Done(bounds);
                Ok(bounds)
            }
            Err(e) => {
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    /// Drive a whole run against `source`, sampling `feed` for each corner.
    pub fn collect<S: SampleSource>(
        &mut self,
        source: &mut S,
        feed: Option<&dyn RawFeed>,
    ) -> Result<Bounds> {
        let mut corner = self.start()?;
        loop {
            let sample = match source.capture(feed, corner, self.target(corner)) {
                Ok(sample) => sample,
                Err(e) => {
                    self.abort();
                    return Err(e);
                }
            };
            match self.record(sample)? {
                Some(next) => corner = next,
                None => break,
            }
        }
        self.finish()
    }
}

/// Calibrate interactively on the terminal and publish the result.
pub fn run(config: &Config, screen: ScreenSize) -> Result<Bounds> {
    let segment = match Segment::open(&config.segment, &config.segment_options()) {
        Ok(segment) => Some(segment),
        Err(e) => {
            log::error!("{}", e);
            None
        }
    };

    install_signal_cleanup(segment.as_ref());

    if let Some(segment) = &segment {
        let current = segment.read();
        log::info!("Current calibration: {}", current.bounds());
        log::debug!(
            "Segment version {}, swap_axes {}, untouch_delay {}, report_delay {}",
            current.version,
            current.swap_axes,
            current.untouch_delay,
            current.report_delay
        );
    }

    let mut source = TerminalSource::new(io::stdin().lock(), io::stderr());
    publish(config, segment, &mut source, screen)
}

/// Collect four samples from `source`, fit them and publish the bounds.
///
/// Nothing is written unless the fit succeeds. The bounds go to the segment
/// first and then, if requested, to the config file; a failed config rewrite
/// leaves the segment write in place. The segment is released on every path
/// out of this function.
pub fn publish<S: SampleSource>(
    config: &Config,
    segment: Option<Segment>,
    source: &mut S,
    screen: ScreenSize,
) -> Result<Bounds> {
    let mut calibration = Calibration::new(screen, config.inset);

    log::info!("Calibrating {}x{} screen", screen.width, screen.height);
    let feed = segment.as_ref().map(|s| s as &dyn RawFeed);
    let result = calibration.collect(source, feed);
    log::debug!("Calibration ended in {:?}", calibration.stage());
    let bounds = result?;
    log::info!("New calibration: {}", bounds);

    if let Some(segment) = segment {
        segment.write(&bounds);
        log::info!("Published to {}", segment.name());
        segment.close();
    }

    if let Some(sink) = config.sink() {
        log::debug!("Mirroring calibration into {}", sink.path().display());
        sink.write(&bounds)?;
    }
    Ok(bounds)
}

/// Best-effort unlink on SIGINT/SIGTERM. The kernel drops the mapping at exit.
fn install_signal_cleanup(segment: Option<&Segment>) {
    let unlinker = segment.and_then(Segment::unlinker);
    let result = ctrlc::set_handler(move || {
        log::warn!("Interrupted, releasing shared memory");
        if let Some(unlinker) = &unlinker {
            if let Err(e) = unlinker.unlink() {
                log::warn!("Failed to unlink segment: {}", e);
            }
        }
        std::process::exit(130);
    });
    if let Err(e) = result {
        log::warn!("Cannot install signal handler: {}", e);
    }
}
