use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SplitcapError};

use super::{Invocation, MediaTool};

/// Longest stderr tail kept in error messages.
const STDERR_TAIL: usize = 2000;

/// Runs the ffmpeg / ffprobe binaries as subprocesses.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ffmpeg_path, &config.ffprobe_path)
    }

    /// Check that both binaries are installed and runnable.
    pub fn check(&self) -> Result<()> {
        for binary in [&self.ffmpeg, &self.ffprobe] {
            let output = Command::new(binary).arg("-version").output().map_err(|e| {
                SplitcapError::ExternalTool {
                    tool: binary.display().to_string(),
                    status: "not started".to_string(),
                    stderr: format!(
                        "{e}. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux)"
                    ),
                }
            })?;

            if !output.status.success() {
                return Err(tool_error(binary, &output));
            }
            debug!("{} is available", binary.display());
        }
        Ok(())
    }
}

impl MediaTool for Ffmpeg {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        debug!("ffmpeg {}", invocation);

        let output = Command::new(&self.ffmpeg)
            .arg("-hide_banner")
            .args(invocation.as_args())
            .output()
            .map_err(|e| SplitcapError::ExternalTool {
                tool: self.ffmpeg.display().to_string(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(tool_error(&self.ffmpeg, &output));
        }
        Ok(())
    }

    fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| SplitcapError::ExternalTool {
                tool: self.ffprobe.display().to_string(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SplitcapError::DurationUnavailable {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_duration(path, &String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_duration(path: &Path, stdout: &str) -> Result<f64> {
    let trimmed = stdout.trim();
    let unavailable = |reason: String| SplitcapError::DurationUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let seconds: f64 = trimmed
        .parse()
        .map_err(|e| unavailable(format!("'{trimmed}': {e}")))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(unavailable(format!("'{trimmed}' is not a valid duration")));
    }
    Ok(seconds)
}

fn tool_error(binary: &Path, output: &std::process::Output) -> SplitcapError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let start = stderr
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(i, _)| i)
        .unwrap_or(0);

    SplitcapError::ExternalTool {
        tool: binary.display().to_string(),
        status: output.status.to_string(),
        stderr: stderr[start..].to_string(),
    }
}
