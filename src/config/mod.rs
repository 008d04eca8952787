mod cli;
mod file;

pub use cli::{Cli, Command};

use std::path::PathBuf;

use crate::geometry::{ScreenSize, DEFAULT_INSET};
use crate::segment::{SegmentOptions, DEFAULT_SEGMENT_NAME};
use crate::sink::{ConfigSink, DEFAULT_XORG_CONFIG};

use file::FileConfig;

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub segment: String,
    pub xorg_config: PathBuf,
    pub update_config: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub inset: u32,
    pub expect_version: Option<i32>,
    pub keep_segment: bool,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();

        Self::merge(cli, file_config)
    }

    fn merge(cli: &Cli, file_config: FileConfig) -> Self {
        Self {
            segment: cli
                .segment
                .clone()
                .or(file_config.segment)
                .unwrap_or_else(|| DEFAULT_SEGMENT_NAME.into()),
            xorg_config: cli
                .xorg_config
                .clone()
                .or(file_config.xorg_config)
                .unwrap_or_else(|| DEFAULT_XORG_CONFIG.into()),
            update_config: cli.update_config || file_config.update_config,
            width: cli.width.or(file_config.width),
            height: cli.height.or(file_config.height),
            inset: cli.inset.or(file_config.inset).unwrap_or(DEFAULT_INSET),
            expect_version: cli.expect_version.or(file_config.expect_version),
            keep_segment: cli.keep_segment || file_config.keep_segment,
        }
    }

    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions {
            unlink_on_close: !self.keep_segment,
            expect_version: self.expect_version,
        }
    }

    /// Options for commands that only inspect the segment.
    pub fn inspect_options(&self) -> SegmentOptions {
        SegmentOptions {
            unlink_on_close: false,
            expect_version: self.expect_version,
        }
    }

    /// The configuration file writer, if rewriting was requested.
    pub fn sink(&self) -> Option<ConfigSink> {
        self.update_config
            .then(|| ConfigSink::new(self.xorg_config.clone()))
    }

    pub fn screen(&self) -> Option<ScreenSize> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(ScreenSize::new(w, h)),
            _ => None,
        }
    }

    /// Checks needed before a calibration run.
    pub fn validate(&self) -> Result<ScreenSize, &'static str> {
        let screen = self.screen().ok_or("Screen size unknown")?;
        if screen.width == 0 || screen.height == 0 {
            return Err("Screen size must be non-zero");
        }
        if self.inset.saturating_mul(2) >= screen.width.min(screen.height) {
            return Err("Target inset leaves no room between targets");
        }
        Ok(screen)
    }
}
