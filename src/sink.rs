//! Mirror calibration bounds into the X server configuration.
//!
//! Only lines tagged with one of the elographics markers are rewritten, e.g.
//!
//! ```text
//! Option "MinX" "80" #ELOGRAPHICS_MINX
//! ```
//!
//! becomes `Option "MinX" "120" #ELOGRAPHICS_MINX` for `min_x = 120`. Every
//! other byte of the file is passed through unchanged, whatever its encoding.
//! The new content is written next to the original and renamed over it, so a
//! failed run never leaves a truncated file behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::record::{Bound, Bounds};

/// Default location of the display server configuration.
pub const DEFAULT_XORG_CONFIG: &str = "/etc/X11/xorg.conf";

/// A tag marking the option line that holds one bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    tag: &'static str,
    option: &'static str,
    bound: Bound,
}

const MARKERS: [Marker; 4] = [
    Marker {
        tag: "#ELOGRAPHICS_MINX",
        option: "MinX",
        bound: Bound::MinX,
    },
    Marker {
        tag: "#ELOGRAPHICS_MAXX",
        option: "MaxX",
        bound: Bound::MaxX,
    },
    Marker {
        tag: "#ELOGRAPHICS_MINY",
        option: "MinY",
        bound: Bound::MinY,
    },
    Marker {
        tag: "#ELOGRAPHICS_MAXY",
        option: "MaxY",
        bound: Bound::MaxY,
    },
];

/// Rewrites the tagged lines of one configuration file.
#[derive(Debug, Clone)]
pub struct ConfigSink {
    path: PathBuf,
}

impl ConfigSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the file in place. Returns the number of lines changed.
    pub fn write(&self, bounds: &Bounds) -> Result<usize> {
        let source = fs::read(&self.path).map_err(|source| Error::SourceUnreadable {
            path: self.path.clone(),
            source,
        })?;

        let (content, rewritten) = rewrite(&source, bounds);
        if rewritten == 0 {
            log::warn!("No #ELOGRAPHICS_* lines found in {}", self.path.display());
        }

        self.replace(&content)?;
        log::info!("Updated {} line(s) in {}", rewritten, self.path.display());
        Ok(rewritten)
    }

    fn replace(&self, content: &[u8]) -> Result<()> {
        // A symlinked config stays a symlink; its target is what gets replaced.
        let target = fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        replace_via(dir, &target, content)
    }
}

/// Write `content` to a temporary file in `dir`, then rename it over `target`.
fn replace_via(dir: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let unwritable = |source| Error::SinkUnwritable {
        path: target.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(unwritable)?;
    tmp.write_all(content).map_err(unwritable)?;
    tmp.as_file().sync_all().map_err(unwritable)?;

    if let Ok(meta) = fs::metadata(target) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(unwritable)?;
    }

    log::debug!("Renaming {} over {}", tmp.path().display(), target.display());
    tmp.persist(target).map_err(|e| unwritable(e.error))?;
    Ok(())
}

/// Rewrite every tagged line of `source`. Returns the new content and the
/// number of lines that were rewritten.
pub fn rewrite(source: &[u8], bounds: &Bounds) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(source.len());
    let mut rewritten = 0;

    for line in source.split_inclusive(|&b| b == b'\n') {
        match rewrite_line(line, bounds) {
            Some(new_line) => {
                out.extend_from_slice(&new_line);
                rewritten += 1;
            }
            None => out.extend_from_slice(line),
        }
    }

    (out, rewritten)
}

/// Returns the rewritten line, or `None` if it is not a tagged option line.
///
/// Markers and option tokens are ASCII, so the line is matched as raw bytes
/// and anything else in it is copied through as is.
fn rewrite_line(line: &[u8], bounds: &Bounds) -> Option<Vec<u8>> {
    let content = line.trim_ascii_end();

    let (marker, head) = MARKERS.iter().find_map(|m| {
        let head = content.strip_suffix(m.tag.as_bytes())?;
        head.last()
            .is_some_and(u8::is_ascii_whitespace)
            .then_some((m, head))
    })?;

    // head: `Option "MinX" "<value>" `
    let value_end = head.trim_ascii_end().len();
    let quoted = &head[..value_end];
    let value_start = quoted.strip_suffix(b"\"")?.iter().rposition(|&b| b == b'"')? + 1;
    let before_value = &head[..value_start];

    if !names_option(before_value, marker.option) {
        log::warn!(
            "Line tagged {} does not set {}, leaving it alone: {}",
            marker.tag,
            marker.option,
            String::from_utf8_lossy(content)
        );
        return None;
    }

    let value = bounds.get(marker.bound).to_string();
    let mut new_line = Vec::with_capacity(line.len() + 8);
    new_line.extend_from_slice(before_value);
    new_line.extend_from_slice(value.as_bytes());
    new_line.extend_from_slice(&line[value_end - 1..]);
    Some(new_line)
}

/// Whether the bytes before the value token are `Option "<name>" "`, with the
/// option name compared case-insensitively.
fn names_option(before_value: &[u8], option: &str) -> bool {
    let Some(rest) = before_value.strip_suffix(b"\"") else {
        return false;
    };
    let mut parts = rest.split(|&b| b == b'"');
    let keyword = parts.next().unwrap_or_default().trim_ascii();
    let name = parts.next().unwrap_or_default();
    let between = parts.next().unwrap_or_default();

    keyword.eq_ignore_ascii_case(b"Option")
        && name.eq_ignore_ascii_case(option.as_bytes())
        && between.trim_ascii().is_empty()
        && parts.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BOUNDS: Bounds = Bounds {
        min_x: 120,
        max_x: 3900,
        min_y: 3850,
        max_y: 95,
    };

    /// Rewrite UTF-8 text, for tests that only deal in readable lines.
    fn rewrite_text(source: &str) -> (String, usize) {
        let (out, n) = rewrite(source.as_bytes(), &BOUNDS);
        (String::from_utf8(out).unwrap(), n)
    }

    const XORG_CONF: &str = "\
Section \"InputDevice\"
\tIdentifier \"touchscreen\"
\tDriver \"elographics\"
\tOption \"Device\" \"/dev/ttyS0\"
\tOption \"MinX\" \"80\" #ELOGRAPHICS_MINX
\tOption \"MaxX\" \"4000\" #ELOGRAPHICS_MAXX
\tOption \"MinY\" \"4010\" #ELOGRAPHICS_MINY
\tOption \"MaxY\" \"60\" #ELOGRAPHICS_MAXY
\tOption \"SwapXY\" \"0\"
EndSection
";

    #[test]
    fn test_rewrite_single_line() {
        let (out, n) = rewrite_text("Option \"MinX\" \"80\" #ELOGRAPHICS_MINX\n");
        assert_eq!(out, "Option \"MinX\" \"120\" #ELOGRAPHICS_MINX\n");
        assert_eq!(n, 1);
    }

    #[test]
    fn test_rewrite_full_section() {
        let (out, n) = rewrite_text(XORG_CONF);
        assert_eq!(n, 4);
        assert!(out.contains("\tOption \"MinX\" \"120\" #ELOGRAPHICS_MINX\n"));
        assert!(out.contains("\tOption \"MaxX\" \"3900\" #ELOGRAPHICS_MAXX\n"));
        assert!(out.contains("\tOption \"MinY\" \"3850\" #ELOGRAPHICS_MINY\n"));
        assert!(out.contains("\tOption \"MaxY\" \"95\" #ELOGRAPHICS_MAXY\n"));

        let untagged = |s: &str| -> Vec<String> {
            s.lines()
                .filter(|l| !l.contains("#ELOGRAPHICS_"))
                .map(String::from)
                .collect()
        };
        assert_eq!(untagged(&out), untagged(XORG_CONF));
    }

    #[test]
    fn test_option_name_is_case_insensitive() {
        let (out, n) = rewrite_text("  option \"minx\"   \"80\"\t#ELOGRAPHICS_MINX  \r\n");
        assert_eq!(out, "  option \"minx\"   \"120\"\t#ELOGRAPHICS_MINX  \r\n");
        assert_eq!(n, 1);
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let line = "Option \"MinX\" \"80\" #elographics_minx\n";
        assert_eq!(rewrite_text(line), (line.to_string(), 0));
    }

    #[test]
    fn test_marker_must_end_the_line() {
        let line = "Option \"MinX\" \"80\" #ELOGRAPHICS_MINX old\n";
        assert_eq!(rewrite_text(line), (line.to_string(), 0));

        let glued = "Option \"MinX\" \"80\"#ELOGRAPHICS_MINX\n";
        assert_eq!(rewrite_text(glued), (glued.to_string(), 0));
    }

    #[test]
    fn test_mismatched_option_is_untouched() {
        let line = "Option \"MaxX\" \"80\" #ELOGRAPHICS_MINX\n";
        assert_eq!(rewrite_text(line), (line.to_string(), 0));
    }

    #[test]
    fn test_last_line_without_newline() {
        let (out, n) = rewrite_text("Option \"MaxY\" \"60\" #ELOGRAPHICS_MAXY");
        assert_eq!(out, "Option \"MaxY\" \"95\" #ELOGRAPHICS_MAXY");
        assert_eq!(n, 1);
    }

    #[test]
    fn test_negative_values() {
        let bounds = Bounds {
            min_x: -12,
            ..BOUNDS
        };
        let (out, _) = rewrite(b"Option \"MinX\" \"80\" #ELOGRAPHICS_MINX\n", &bounds);
        assert_eq!(out, b"Option \"MinX\" \"-12\" #ELOGRAPHICS_MINX\n");
    }

    #[test]
    fn test_non_utf8_bytes_pass_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xorg.conf");
        fs::write(&path, b"# Sch\xf6n\nOption \"MinX\" \"80\" #ELOGRAPHICS_MINX\n").unwrap();

        assert_eq!(ConfigSink::new(&path).write(&BOUNDS).unwrap(), 1);
        assert_eq!(
            fs::read(&path).unwrap(),
            b"# Sch\xf6n\nOption \"MinX\" \"120\" #ELOGRAPHICS_MINX\n"
        );
    }

    #[test]
    fn test_write_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xorg.conf");
        fs::write(&path, XORG_CONF).unwrap();

        let sink = ConfigSink::new(&path);
        sink.write(&BOUNDS).unwrap();
        let once = fs::read(&path).unwrap();
        sink.write(&BOUNDS).unwrap();
        let twice = fs::read(&path).unwrap();

        assert_eq!(once, twice);
        assert_ne!(once, XORG_CONF.as_bytes());
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xorg.conf");
        fs::write(&path, XORG_CONF).unwrap();

        assert_eq!(ConfigSink::new(&path).write(&BOUNDS).unwrap(), 4);

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.conf");

        let err = ConfigSink::new(&path).write(&BOUNDS).unwrap_err();
        assert!(matches!(err, Error::SourceUnreadable { .. }), "{}", err);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_temp_dir_leaves_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xorg.conf");
        fs::write(&path, XORG_CONF).unwrap();

        let err = replace_via(&dir.path().join("gone"), &path, b"replaced").unwrap_err();
        assert!(matches!(err, Error::SinkUnwritable { .. }), "{}", err);
        assert_eq!(fs::read_to_string(&path).unwrap(), XORG_CONF);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xorg.conf");
        fs::write(&path, XORG_CONF).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        ConfigSink::new(&path).write(&BOUNDS).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_keeps_symlink() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.conf");
        let link = dir.path().join("xorg.conf");
        fs::write(&real, XORG_CONF).unwrap();
        std::os::unix::fs::symlink("real.conf", &link).unwrap();

        assert_eq!(ConfigSink::new(&link).write(&BOUNDS).unwrap(), 4);

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        let content = fs::read_to_string(&real).unwrap();
        assert!(content.contains("\tOption \"MinX\" \"120\" #ELOGRAPHICS_MINX\n"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
