use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::VideoCodec;
use crate::error::Result;
use crate::files::{remove_if_exists, scratch_path};
use crate::media::{Invocation, MediaTool};

use super::AUDIO_CODEC;

/// Pixel format forced on captioned output for player compatibility.
pub const OUTPUT_PIX_FMT: &str = "yuv420p";

/// Escape a path for use as the `ass` filter's file name inside `-vf`.
///
/// ffmpeg unescapes twice: once for the filter option value and once for
/// the filtergraph, so both levels are applied here.
pub fn escape_filter_path(path: &Path) -> String {
    let mut value = String::new();
    for c in path.to_string_lossy().chars() {
        if matches!(c, '\\' | '\'' | ':') {
            value.push('\\');
        }
        value.push(c);
    }

    let mut graph = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph.push('\\');
        }
        graph.push(c);
    }
    graph
}

pub fn burn_invocation(
    video: &Path,
    subtitles: &Path,
    codec: VideoCodec,
    output: &Path,
) -> Invocation {
    Invocation::new()
        .arg("-i")
        .arg(video)
        .arg("-vf")
        .arg(format!("ass={}", escape_filter_path(subtitles)))
        .args(["-c:v", codec.as_str(), "-c:a", AUDIO_CODEC])
        .args(["-pix_fmt", OUTPUT_PIX_FMT, "-y"])
        .arg(output)
}

/// Render `subtitles` into the pixels of `video`, writing a new scratch mp4.
pub fn burn_captions(
    tool: &dyn MediaTool,
    codec: VideoCodec,
    video: &Path,
    subtitles: &Path,
    temp_dir: &Path,
) -> Result<PathBuf> {
    info!("Adding subtitles to video: {}", video.display());

    let output = scratch_path(temp_dir, "mp4")?;
    if let Err(e) = tool.run(&burn_invocation(video, subtitles, codec, &output)) {
        remove_if_exists(&output);
        return Err(e);
    }

    info!("Subtitles added successfully: {}", output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::RecordingTool;
    use std::ffi::OsStr;

    #[test]
    fn test_burn_invocation() {
        let inv = burn_invocation(
            Path::new("composite.mp4"),
            Path::new("temp/captions.ass"),
            VideoCodec::VideoToolbox,
            Path::new("temp/out.mp4"),
        );

        assert_eq!(inv.value_of("-vf"), Some(OsStr::new("ass=temp/captions.ass")));
        assert_eq!(inv.value_of("-c:v"), Some(OsStr::new("h264_videotoolbox")));
        assert_eq!(inv.value_of("-c:a"), Some(OsStr::new("aac")));
        assert_eq!(inv.value_of("-pix_fmt"), Some(OsStr::new("yuv420p")));
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("temp/captions.ass")), "temp/captions.ass");
        assert_eq!(
            escape_filter_path(Path::new(r"C:\tmp\a.ass")),
            r"C\\:\\\\tmp\\\\a.ass"
        );
        assert_eq!(escape_filter_path(Path::new("it's.ass")), r"it\\\'s.ass");
        assert_eq!(escape_filter_path(Path::new("a,b;[c].ass")), r"a\,b\;\[c\].ass");
    }

    #[test]
    fn test_burn_invocation_escapes_subtitle_path() {
        let inv = burn_invocation(
            Path::new("composite.mp4"),
            Path::new("/tmp/my clips: day 1/captions.ass"),
            VideoCodec::Libx264,
            Path::new("out.mp4"),
        );

        assert_eq!(
            inv.value_of("-vf"),
            Some(OsStr::new(r"ass=/tmp/my clips\\: day 1/captions.ass"))
        );
    }

    #[test]
    fn test_burn_captions() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RecordingTool::new(10.0);

        let out = burn_captions(
            &tool,
            VideoCodec::Libx264,
            Path::new("composite.mp4"),
            Path::new("captions.ass"),
            dir.path(),
        )
        .unwrap();

        assert!(out.exists());
        assert_eq!(tool.calls()[0].output(), Some(out.as_path()));
    }
}
