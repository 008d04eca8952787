//! Client side of the driver's named shared memory segment.
//!
//! The elographics driver creates `/ELOGRAPHICS_CAL` and keeps writing the
//! last raw touch position into it. We only ever open an existing object,
//! map one [`CalibrationRecord`], write the four bound fields and, by
//! protocol convention, unlink the name when the calibration run ends.
//!
//! Unlinking an object the driver owns is fragile: if the driver was
//! restarted while we held the segment, the name now refers to a new object
//! that is not ours to remove. The device/inode pair of the object is
//! recorded at open time and the name is only unlinked while it still
//! refers to that same object.
//!
//! There is no locking in the protocol. Each field is a naturally aligned
//! `i32` accessed with a single volatile load or store, so the driver and we
//! can only observe stale values, never a mix of two writes to one field.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::FromRawFd;
use std::os::unix::fs::MetadataExt;
use std::ptr;

use memmap2::{MmapOptions, MmapRaw};

use crate::error::{Error, Result};
use crate::record::{self, Bound, Bounds, CalibrationRecord, Field, RECORD_SIZE};

/// Name under which the driver publishes its calibration record.
pub const DEFAULT_SEGMENT_NAME: &str = "/ELOGRAPHICS_CAL";

#[derive(Debug, Clone, Default)]
pub struct SegmentOptions {
    /// Remove the name from the shm namespace on close.
    pub unlink_on_close: bool,
    /// Refuse records whose `version` differs from this value.
    pub expect_version: Option<i32>,
}

/// Identity of a shm object, independent of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ObjectId {
    dev: u64,
    ino: u64,
}

impl ObjectId {
    fn of(file: &File) -> io::Result<Self> {
        let meta = file.metadata()?;
        Ok(Self {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }
}

/// A mapped calibration record.
///
/// Only exists after a successful open and map, so releasing it never
/// touches an invalid handle. The mapping is dropped with the value.
pub struct Segment {
    name: String,
    map: MmapRaw,
    id: ObjectId,
    unlink_on_close: bool,
    released: bool,
}

impl Segment {
    /// Open and map an existing segment. Never creates the object.
    pub fn open(name: &str, options: &SegmentOptions) -> Result<Self> {
        let unavailable = |source| Error::SegmentUnavailable {
            name: name.to_string(),
            source,
        };
        let map_failed = |source| Error::MapFailed {
            name: name.to_string(),
            source,
        };

        let file = shm_open(name, libc::O_RDWR, 0).map_err(unavailable)?;
        let id = ObjectId::of(&file).map_err(unavailable)?;

        let len = file.metadata().map_err(map_failed)?.len();
        if len < RECORD_SIZE as u64 {
            return Err(map_failed(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("object is {} bytes, record needs {}", len, RECORD_SIZE),
            )));
        }

        let map = MmapOptions::new()
            .len(RECORD_SIZE)
            .map_raw(&file)
            .map_err(map_failed)?;

        log::debug!("Mapped {} ({} bytes, inode {})", name, RECORD_SIZE, id.ino);

        let mut segment = Self {
            name: name.to_string(),
            map,
            id,
            unlink_on_close: options.unlink_on_close,
            released: false,
        };

        if let Some(expected) = options.expect_version {
            let found = segment.load(Field::Version);
            if found != expected {
                // Not a record we understand, so not ours to remove either.
                segment.unlink_on_close = false;
                return Err(Error::VersionMismatch {
                    name: name.to_string(),
                    expected,
                    found,
                });
            }
        }

        Ok(segment)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of all ten fields as currently seen in shared memory.
    pub fn read(&self) -> CalibrationRecord {
        let mut buf = [0u8; RECORD_SIZE];
        for field in Field::ALL {
            record::write_field(&mut buf, field, self.load(field));
        }
        CalibrationRecord::unpack(&buf)
    }

    /// Current raw touch position reported by the driver.
    pub fn raw_position(&self) -> (i32, i32) {
        (self.load(Field::CurX), self.load(Field::CurY))
    }

    /// Store the four bounds in place. Driver-owned fields are not touched.
    pub fn write(&self, bounds: &Bounds) {
        for bound in Bound::ALL {
            self.store(bound.field(), bounds.get(bound));
        }
        log::debug!("Wrote {} to {}", bounds, self.name);
    }

    /// Handle that can unlink this segment's name from another thread, e.g.
    /// a signal handler. `None` when unlinking is disabled.
    pub fn unlinker(&self) -> Option<Unlinker> {
        self.unlink_on_close.then(|| Unlinker {
            name: self.name.clone(),
            id: self.id,
        })
    }

    /// Unlink the name (if configured) and unmap the record.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if !self.unlink_on_close {
            log::debug!("Leaving {} in place", self.name);
            return;
        }
        match unlink_if_same(&self.name, self.id) {
            Ok(true) => log::debug!("Unlinked {}", self.name),
            Ok(false) => log::warn!(
                "{} no longer refers to the segment we opened, leaving it alone",
                self.name
            ),
            Err(e) => log::warn!("Failed to unlink {}: {}", self.name, e),
        }
    }

    fn load(&self, field: Field) -> i32 {
        // SAFETY: the mapping is RECORD_SIZE bytes and page aligned, and
        // every field offset is a multiple of 4 inside it.
        unsafe { ptr::read_volatile(self.map.as_ptr().add(field.offset()) as *const i32) }
    }

    fn store(&self, field: Field, value: i32) {
        // SAFETY: see `load`. The mapping is shared and writable.
        unsafe { ptr::write_volatile(self.map.as_mut_ptr().add(field.offset()) as *mut i32, value) }
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        self.release();
    }
}

/// Detached unlink capability for best-effort cleanup on termination.
#[derive(Debug, Clone)]
pub struct Unlinker {
    name: String,
    id: ObjectId,
}

impl Unlinker {
    pub fn unlink(&self) -> io::Result<bool> {
        unlink_if_same(&self.name, self.id)
    }
}

/// Unlink `name` only while it still refers to the object identified by `id`.
fn unlink_if_same(name: &str, id: ObjectId) -> io::Result<bool> {
    let current = match shm_open(name, libc::O_RDONLY, 0) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if ObjectId::of(&current)? != id {
        return Ok(false);
    }
    shm_unlink(name)?;
    Ok(true)
}

fn c_name(name: &str) -> io::Result<CString> {
    CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn shm_open(name: &str, oflag: libc::c_int, mode: libc::mode_t) -> io::Result<File> {
    let c_name = c_name(name)?;
    // SAFETY: c_name is a valid NUL-terminated string.
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), oflag, mode) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: fd was just returned by shm_open and has no other owner.
    Ok(unsafe { File::from_raw_fd(fd) })
}

fn shm_unlink(name: &str) -> io::Result<()> {
    let c_name = c_name(name)?;
    // SAFETY: c_name is a valid NUL-terminated string.
    if unsafe { libc::shm_unlink(c_name.as_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
