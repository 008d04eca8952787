//! Binary layout of the calibration record shared with the elographics driver.
//!
//! The driver and this tool agree on ten consecutive native-endian `i32`
//! values with no padding and no header. The layout is defined here by byte
//! offsets, not by a `#[repr(C)]` struct, so it holds for a driver built by
//! any compiler as long as both sides use the same integer width and
//! endianness.
//!
//! | offset | field           | owner  |
//! |--------|-----------------|--------|
//! | 0      | `version`       | driver |
//! | 4      | `cur_x`         | driver |
//! | 8      | `cur_y`         | driver |
//! | 12     | `min_x`         | us     |
//! | 16     | `max_x`         | us     |
//! | 20     | `min_y`         | us     |
//! | 24     | `max_y`         | us     |
//! | 28     | `swap_axes`     | driver |
//! | 32     | `untouch_delay` | driver |
//! | 36     | `report_delay`  | driver |

use std::fmt;

/// Size of one field in bytes.
pub const FIELD_SIZE: usize = 4;

/// Number of fields in the record.
pub const FIELD_COUNT: usize = 10;

/// Size of the whole record as mapped from the segment.
pub const RECORD_SIZE: usize = FIELD_SIZE * FIELD_COUNT;

/// One `i32` slot of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Version,
    CurX,
    CurY,
    MinX,
    MaxX,
    MinY,
    MaxY,
    SwapAxes,
    UntouchDelay,
    ReportDelay,
}

impl Field {
    /// All fields in layout order.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Version,
        Field::CurX,
        Field::CurY,
        Field::MinX,
        Field::MaxX,
        Field::MinY,
        Field::MaxY,
        Field::SwapAxes,
        Field::UntouchDelay,
        Field::ReportDelay,
    ];

    pub fn offset(self) -> usize {
        let index = match self {
            Field::Version => 0,
            Field::CurX => 1,
            Field::CurY => 2,
            Field::MinX => 3,
            Field::MaxX => 4,
            Field::MinY => 5,
            Field::MaxY => 6,
            Field::SwapAxes => 7,
            Field::UntouchDelay => 8,
            Field::ReportDelay => 9,
        };
        index * FIELD_SIZE
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Version => "version",
            Field::CurX => "cur_x",
            Field::CurY => "cur_y",
            Field::MinX => "min_x",
            Field::MaxX => "max_x",
            Field::MinY => "min_y",
            Field::MaxY => "max_y",
            Field::SwapAxes => "swap_axes",
            Field::UntouchDelay => "untouch_delay",
            Field::ReportDelay => "report_delay",
        }
    }
}

/// The four fields a calibration write may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    MinX,
    MaxX,
    MinY,
    MaxY,
}

impl Bound {
    pub const ALL: [Bound; 4] = [Bound::MinX, Bound::MaxX, Bound::MinY, Bound::MaxY];

    /// The record slot holding this bound.
    pub fn field(self) -> Field {
        match self {
            Bound::MinX => Field::MinX,
            Bound::MaxX => Field::MaxX,
            Bound::MinY => Field::MinY,
            Bound::MaxY => Field::MaxY,
        }
    }
}

/// The four calibration bounds written into the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn get(&self, bound: Bound) -> i32 {
        match bound {
            Bound::MinX => self.min_x,
            Bound::MaxX => self.max_x,
            Bound::MinY => self.min_y,
            Bound::MaxY => self.max_y,
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MinX:{} MaxX:{} MinY:{} MaxY:{}",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// Value snapshot of the shared record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationRecord {
    pub version: i32,
    pub cur_x: i32,
    pub cur_y: i32,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub swap_axes: i32,
    pub untouch_delay: i32,
    pub report_delay: i32,
}

impl CalibrationRecord {
    pub fn get(&self, field: Field) -> i32 {
        match field {
            Field::Version => self.version,
            Field::CurX => self.cur_x,
            Field::CurY => self.cur_y,
            Field::MinX => self.min_x,
            Field::MaxX => self.max_x,
            Field::MinY => self.min_y,
            Field::MaxY => self.max_y,
            Field::SwapAxes => self.swap_axes,
            Field::UntouchDelay => self.untouch_delay,
            Field::ReportDelay => self.report_delay,
        }
    }

    pub fn set(&mut self, field: Field, value: i32) {
        let slot = match field {
            Field::Version => &mut self.version,
            Field::CurX => &mut self.cur_x,
            Field::CurY => &mut self.cur_y,
            Field::MinX => &mut self.min_x,
            Field::MaxX => &mut self.max_x,
            Field::MinY => &mut self.min_y,
            Field::MaxY => &mut self.max_y,
            Field::SwapAxes => &mut self.swap_axes,
            Field::UntouchDelay => &mut self.untouch_delay,
            Field::ReportDelay => &mut self.report_delay,
        };
        *slot = value;
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_x: self.min_x,
            max_x: self.max_x,
            min_y: self.min_y,
            max_y: self.max_y,
        }
    }

    pub fn unpack(buf: &[u8; RECORD_SIZE]) -> Self {
        let mut record = Self::default();
        for field in Field::ALL {
            record.set(field, read_field(buf, field));
        }
        record
    }

    #[cfg(test)]
    pub fn pack(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        for field in Field::ALL {
            write_field(&mut buf, field, self.get(field));
        }
        buf
    }
}

/// Read one field from a record-sized buffer.
pub fn read_field(buf: &[u8; RECORD_SIZE], field: Field) -> i32 {
    let at = field.offset();
    i32::from_ne_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Write one field into a record-sized buffer.
pub fn write_field(buf: &mut [u8; RECORD_SIZE], field: Field, value: i32) {
    let at = field.offset();
    buf[at..at + FIELD_SIZE].copy_from_slice(&value.to_ne_bytes());
}
