use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, info};

use crate::config::VideoCodec;
use crate::error::Result;
use crate::files::{remove_if_exists, unix_timestamp};
use crate::media::{Invocation, MediaTool};

use super::segment::trim_segment;
use super::AUDIO_CODEC;

/// Size of each half of the stacked frame.
pub const PANEL_WIDTH: u32 = 1080;
pub const PANEL_HEIGHT: u32 = 960;

pub const OUTPUT_FPS: u32 = 30;

/// Result of stacking a primary clip over a background excerpt.
#[derive(Debug, Clone)]
pub struct Composition {
    pub output: PathBuf,
    /// Duration of the primary clip, which the composite follows.
    pub duration: f64,
    /// Offset into the background clip the excerpt was taken from.
    pub background_start: u64,
}

/// Center square crop followed by a scale to one panel.
fn panel_filter(input: usize, label: &str) -> String {
    format!(
        "[{input}:v]crop=min(iw\\,ih):min(iw\\,ih):(iw-min(iw\\,ih))/2:(ih-min(iw\\,ih))/2,\
         scale={PANEL_WIDTH}:{PANEL_HEIGHT}[{label}]"
    )
}

/// Filter graph stacking input 0 above input 1.
pub fn filter_graph() -> String {
    format!(
        "{};{};[v1][v2]vstack=inputs=2[v]",
        panel_filter(0, "v1"),
        panel_filter(1, "v2")
    )
}

pub fn compose_invocation(
    primary: &Path,
    background: &Path,
    codec: VideoCodec,
    output: &Path,
) -> Invocation {
    Invocation::new()
        .arg("-i")
        .arg(primary)
        .arg("-i")
        .arg(background)
        .arg("-filter_complex")
        .arg(filter_graph())
        .args(["-map", "[v]", "-map", "0:a?"])
        .args(["-c:v", codec.as_str(), "-c:a", AUDIO_CODEC])
        .args(["-r", &OUTPUT_FPS.to_string(), "-y"])
        .arg(output)
}

/// `<target_dir>/<unix time><primary file stem>.mp4`
///
/// Always mp4: the encoders are fixed to H.264 + AAC whatever the source
/// container was.
pub fn composite_path(target_dir: &Path, primary: &Path) -> PathBuf {
    let stem = primary
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    target_dir.join(format!("{}{}.mp4", unix_timestamp(), stem))
}

/// Builds split-screen composites with ffmpeg.
pub struct Composer<'a> {
    tool: &'a dyn MediaTool,
    codec: VideoCodec,
    temp_dir: &'a Path,
}

impl<'a> Composer<'a> {
    pub fn new(tool: &'a dyn MediaTool, codec: VideoCodec, temp_dir: &'a Path) -> Self {
        Self {
            tool,
            codec,
            temp_dir,
        }
    }

    /// Stack `primary` over an excerpt of `background` matching its length.
    ///
    /// The primary's audio is kept when it has any. The background excerpt
    /// is removed whether or not ffmpeg succeeds.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        primary: &Path,
        background: &Path,
        used_offsets: Option<&HashSet<u64>>,
        target_dir: &Path,
    ) -> Result<Composition> {
        info!(
            "Combining videos: {} + {}",
            primary.display(),
            background.display()
        );

        let duration = self.tool.probe_duration(primary)?;
        let output = composite_path(target_dir, primary);
        let excerpt = trim_segment(
            self.tool,
            rng,
            background,
            duration,
            None,
            used_offsets,
            self.temp_dir,
        )?;

        let result = self.tool.run(&compose_invocation(
            primary,
            &excerpt.path,
            self.codec,
            &output,
        ));
        remove_if_exists(&excerpt.path);

        if let Err(e) = result {
            remove_if_exists(&output);
            return Err(e);
        }

        debug!("Composite written to {}", output.display());
        Ok(Composition {
            output,
            duration,
            background_start: excerpt.start,
        })
    }
}
