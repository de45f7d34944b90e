use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::files::{remove_if_exists, scratch_path};

use super::{Invocation, MediaTool};

pub fn extract_audio_invocation(input: &Path, output: &Path) -> Invocation {
    Invocation::new()
        .arg("-i")
        .arg(input)
        .args(["-q:a", "0", "-map", "a", "-y"])
        .arg(output)
}

/// Extract the audio track of `input` into a fresh mp3 in `temp_dir`.
///
/// Fails when ffmpeg does, including when `input` has no audio stream.
pub fn extract_audio(tool: &dyn MediaTool, input: &Path, temp_dir: &Path) -> Result<PathBuf> {
    let output = scratch_path(temp_dir, "mp3")?;

    if let Err(e) = tool.run(&extract_audio_invocation(input, &output)) {
        remove_if_exists(&output);
        return Err(e);
    }

    info!("Audio extracted to {}", output.display());
    Ok(output)
}
