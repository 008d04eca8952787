//! Screen geometry: the four calibration corners and their pixel targets.

use std::fmt;

/// Default distance of each target from the nearest screen edges, in pixels.
pub const DEFAULT_INSET: u32 = 50;

/// Calibration corners, in the order the samples are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Position of this corner in sample and target arrays.
    pub fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomLeft => 2,
            Corner::BottomRight => 3,
        }
    }

    pub fn next(self) -> Option<Corner> {
        Corner::ALL.get(self.index() + 1).copied()
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corner::TopLeft => write!(f, "top-left"),
            Corner::TopRight => write!(f, "top-right"),
            Corner::BottomLeft => write!(f, "bottom-left"),
            Corner::BottomRight => write!(f, "bottom-right"),
        }
    }
}

/// Display size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// A known pixel position the operator is asked to touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTarget {
    pub x: f64,
    pub y: f64,
}

impl ScreenTarget {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for ScreenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Targets `inset` pixels in from each edge, indexed by [`Corner::index`].
    //
    // +---------------------+
    // |  0               1  |
    // |                     |
    // |  2               3  |
    // +---------------------+
    pub fn targets(&self, inset: u32) -> [ScreenTarget; 4] {
        let i = inset as f64;
        let w = self.width as f64;
        let h = self.height as f64;
        [
            ScreenTarget::new(i, i),
            ScreenTarget::new(w - i, i),
            ScreenTarget::new(i, h - i),
            ScreenTarget::new(w - i, h - i),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_for_vga() {
        let targets = ScreenSize::new(640, 480).targets(DEFAULT_INSET);
        assert_eq!(targets[0], ScreenTarget::new(50.0, 50.0));
        assert_eq!(targets[1], ScreenTarget::new(590.0, 50.0));
        assert_eq!(targets[2], ScreenTarget::new(50.0, 430.0));
        assert_eq!(targets[3], ScreenTarget::new(590.0, 430.0));
    }

    #[test]
    fn test_corner_order() {
        assert_eq!(Corner::TopLeft.next(), Some(Corner::TopRight));
        assert_eq!(Corner::BottomLeft.next(), Some(Corner::BottomRight));
        assert_eq!(Corner::BottomRight.next(), None);
        for (i, corner) in Corner::ALL.iter().enumerate() {
            assert_eq!(corner.index(), i);
        }
    }

    #[test]
    fn test_corner_display() {
        assert_eq!(Corner::TopRight.to_string(), "top-right");
        assert_eq!(Corner::BottomLeft.to_string(), "bottom-left");
    }
}
