//! Four-point linear fit from raw controller coordinates to screen pixels.
//!
//! Each axis is modelled independently as `raw = a * screen + b`. X is
//! estimated once from the top row and once from the bottom row; Y once from
//! the left column and once from the right column. The two estimates are
//! averaged, which cancels first-order noise of a single pair.
//!
//! The driver wants bounds rather than coefficients: the raw value at
//! screen position 0 and the raw value at the full screen extent.

use crate::error::{Error, Result};
use crate::geometry::{ScreenSize, ScreenTarget};
use crate::record::Bounds;

/// Smallest screen-space distance between two targets of a slope pair.
const MIN_TARGET_SPAN: f64 = 1e-6;

/// A raw touch position captured for one calibration corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub raw_x: i32,
    pub raw_y: i32,
}

impl Sample {
    pub fn new(raw_x: i32, raw_y: i32) -> Self {
        Self { raw_x, raw_y }
    }
}

/// `raw = slope * screen + intercept` for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linear {
    pub slope: f64,
    pub intercept: f64,
}

impl Linear {
    /// Line through `(screen0, raw0)` and `(screen1, raw1)`.
    fn through(axis: &str, screen0: f64, raw0: f64, screen1: f64, raw1: f64) -> Result<Self> {
        let span = screen1 - screen0;
        if span.abs() < MIN_TARGET_SPAN {
            return Err(Error::degenerate(format!(
                "{} targets share screen coordinate {}",
                axis, screen0
            )));
        }
        let slope = (raw1 - raw0) / span;
        Ok(Self {
            slope,
            intercept: raw0 - slope * screen0,
        })
    }

    fn mean(a: Linear, b: Linear) -> Self {
        Self {
            slope: (a.slope + b.slope) / 2.0,
            intercept: (a.intercept + b.intercept) / 2.0,
        }
    }

    pub fn raw_at(&self, screen: f64) -> f64 {
        self.slope * screen + self.intercept
    }
}

/// Per-axis fit of the four samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFit {
    pub x: Linear,
    pub y: Linear,
}

impl AxisFit {
    /// Fit samples to targets, both indexed by [`crate::geometry::Corner::index`].
    pub fn from_samples(samples: &[Sample; 4], targets: &[ScreenTarget; 4]) -> Result<Self> {
        let row = |a: usize, b: usize| {
            Linear::through(
                "X",
                targets[a].x,
                samples[a].raw_x as f64,
                targets[b].x,
                samples[b].raw_x as f64,
            )
        };
        let column = |a: usize, b: usize| {
            Linear::through(
                "Y",
                targets[a].y,
                samples[a].raw_y as f64,
                targets[b].y,
                samples[b].raw_y as f64,
            )
        };

        let x = Linear::mean(row(0, 1)?, row(2, 3)?);
        let y = Linear::mean(column(0, 2)?, column(1, 3)?);

        log::debug!(
            "Fit: a_x={:.6} b_x={:.3} a_y={:.6} b_y={:.3}",
            x.slope,
            x.intercept,
            y.slope,
            y.intercept
        );

        Ok(Self { x, y })
    }

    /// Driver bounds for a screen of the given size.
    ///
    /// The Y bounds are deliberately crossed: `min_y` gets the raw value at
    /// the bottom edge and `max_y` the value at the top edge. This matches
    /// what the driver has always been given for these panels.
    pub fn bounds(&self, screen: ScreenSize) -> Result<Bounds> {
        let min_x = to_bound("min_x", self.x.raw_at(0.0))?;
        let max_x = to_bound("max_x", self.x.raw_at(screen.width as f64))?;
        let top_y = to_bound("max_y", self.y.raw_at(0.0))?;
        let bottom_y = to_bound("min_y", self.y.raw_at(screen.height as f64))?;

        Ok(Bounds {
            min_x,
            max_x,
            min_y: bottom_y,
            max_y: top_y,
        })
    }
}

/// Fit four samples and derive the driver bounds in one step.
pub fn fit(
    samples: &[Sample; 4],
    targets: &[ScreenTarget; 4],
    screen: ScreenSize,
) -> Result<Bounds> {
    AxisFit::from_samples(samples, targets)?.bounds(screen)
}

/// Truncate toward zero, refusing values no `i32` can hold.
fn to_bound(name: &str, value: f64) -> Result<i32> {
    if !value.is_finite() {
        return Err(Error::degenerate(format!("{} is not finite", name)));
    }
    let truncated = value.trunc();
    if truncated < i32::MIN as f64 || truncated > i32::MAX as f64 {
        return Err(Error::degenerate(format!("{} = {} is out of range", name, value)));
    }
    Ok(truncated as i32)
}
