//! Collecting raw samples for the four calibration targets.
//!
//! The operator touches each target on the panel and lifts; pressing Enter
//! marks the release, at which point the driver's last raw position is
//! taken as the sample for that corner.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};
use crate::fit::Sample;
use crate::geometry::{Corner, ScreenTarget};
use crate::segment::Segment;

/// Source of the live raw touch position.
pub trait RawFeed {
    fn raw_position(&self) -> (i32, i32);
}

impl RawFeed for Segment {
    fn raw_position(&self) -> (i32, i32) {
        Segment::raw_position(self)
    }
}

/// Produces one sample per calibration corner.
///
/// `feed` is `None` when the segment could not be opened.
pub trait SampleSource {
    fn capture(
        &mut self,
        feed: Option<&dyn RawFeed>,
        corner: Corner,
        target: ScreenTarget,
    ) -> Result<Sample>;
}

/// Prompts on a terminal and samples the feed when the operator confirms.
pub struct TerminalSource<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalSource<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> SampleSource for TerminalSource<R, W> {
    /// Without a feed every capture fails instead of inventing a position.
    fn capture(
        &mut self,
        feed: Option<&dyn RawFeed>,
        corner: Corner,
        target: ScreenTarget,
    ) -> Result<Sample> {
        let Some(feed) = feed else {
            return Err(Error::missing_sample(corner, "no raw coordinate feed"));
        };

        write!(
            self.output,
            "Touch the {} target at {}, lift, then press Enter (q to abort): ",
            corner, target
        )
        .and_then(|_| self.output.flush())
        .map_err(|e| Error::missing_sample(corner, e.to_string()))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| Error::missing_sample(corner, e.to_string()))?;
        if read == 0 {
            return Err(Error::missing_sample(corner, "input closed"));
        }
        if line.trim().eq_ignore_ascii_case("q") {
            return Err(Error::missing_sample(corner, "aborted by operator"));
        }

        let (raw_x, raw_y) = feed.raw_position();
        log::debug!("Raw ({},{}) for {}", raw_x, raw_y, corner);
        Ok(Sample::new(raw_x, raw_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;

    /// Replays one position per read.
    struct ScriptedFeed {
        positions: RefCell<Vec<(i32, i32)>>,
    }

    impl ScriptedFeed {
        fn new(mut positions: Vec<(i32, i32)>) -> Self {
            positions.reverse();
            Self {
                positions: RefCell::new(positions),
            }
        }
    }

    impl RawFeed for ScriptedFeed {
        fn raw_position(&self) -> (i32, i32) {
            self.positions.borrow_mut().pop().unwrap_or((0, 0))
        }
    }

    const TARGET: ScreenTarget = ScreenTarget { x: 50.0, y: 50.0 };

    #[test]
    fn test_capture_reads_feed_on_enter() {
        let feed = ScriptedFeed::new(vec![(100, 200), (900, 210)]);
        let feed = Some(&feed as &dyn RawFeed);
        let mut out = Vec::new();
        let mut source = TerminalSource::new(Cursor::new("\n\n"), &mut out);

        assert_eq!(
            source.capture(feed, Corner::TopLeft, TARGET).unwrap(),
            Sample::new(100, 200)
        );
        assert_eq!(
            source.capture(feed, Corner::TopRight, TARGET).unwrap(),
            Sample::new(900, 210)
        );

        let prompt = String::from_utf8(out).unwrap();
        assert!(prompt.contains("top-left target at (50, 50)"));
        assert!(prompt.contains("top-right"));
    }

    #[test]
    fn test_quit_aborts() {
        let feed = ScriptedFeed::new(vec![(1, 1)]);
        let mut source = TerminalSource::new(Cursor::new("q\n"), Vec::new());

        let err = source
            .capture(Some(&feed as &dyn RawFeed), Corner::BottomLeft, TARGET)
            .unwrap_err();
        assert!(
            matches!(err, Error::MissingSample { corner: Corner::BottomLeft, .. }),
            "{}",
            err
        );
    }

    #[test]
    fn test_end_of_input_aborts() {
        let feed = ScriptedFeed::new(vec![(1, 1)]);
        let mut source = TerminalSource::new(Cursor::new(""), Vec::new());
        assert!(source
            .capture(Some(&feed as &dyn RawFeed), Corner::TopLeft, TARGET)
            .is_err());
    }

    #[test]
    fn test_without_feed_fails_immediately() {
        let mut out = Vec::new();
        let mut source = TerminalSource::new(Cursor::new("\n"), &mut out);

        let err = source.capture(None, Corner::TopLeft, TARGET).unwrap_err();
        assert!(matches!(err, Error::MissingSample { .. }), "{}", err);
        assert!(out.is_empty());
    }
}
