use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, warn};

use crate::error::Result;
use crate::files::{remove_if_exists, scratch_path};
use crate::media::{Invocation, MediaTool};

/// Random draws tried before falling back to a linear scan for a free offset.
const MAX_DRAW_ATTEMPTS: usize = 64;

/// A stream-copied excerpt of a longer clip, living in the scratch folder.
#[derive(Debug, Clone)]
pub struct SubClip {
    pub path: PathBuf,
    /// Start offset inside the source, in whole seconds.
    pub start: u64,
    pub duration: f64,
}

/// Largest start offset that still leaves `target` seconds of `source`.
///
/// Zero when the source is shorter than the target.
pub fn last_valid_start(source: f64, target: f64) -> u64 {
    let right_end = (source - target).floor();
    if right_end.is_finite() && right_end > 0.0 {
        right_end as u64
    } else {
        0
    }
}

/// Draw a start offset in `[0, right_end]` that is not in `used`.
///
/// Terminates on every input: a collapsed range returns 0 immediately, and
/// after [`MAX_DRAW_ATTEMPTS`] misses the range is scanned for the first
/// free offset. If every offset is taken the last draw is returned.
pub fn choose_start<R: Rng + ?Sized>(
    rng: &mut R,
    right_end: u64,
    used: Option<&HashSet<u64>>,
) -> u64 {
    let mut start = rng.gen_range(0..=right_end);
    let Some(used) = used else {
        return start;
    };

    for _ in 0..MAX_DRAW_ATTEMPTS {
        if right_end == 0 || !used.contains(&start) {
            return start;
        }
        start = rng.gen_range(0..=right_end);
    }

    (0..=right_end)
        .find(|offset| !used.contains(offset))
        .unwrap_or(start)
}

/// Format seconds for ffmpeg's `-ss` / `-t` options.
pub fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}")
}

pub fn trim_invocation(source: &Path, start: u64, duration: f64, output: &Path) -> Invocation {
    Invocation::new()
        .arg("-ss")
        .arg(start.to_string())
        .arg("-i")
        .arg(source)
        .arg("-t")
        .arg(format_seconds(duration))
        .args(["-c:v", "copy", "-c:a", "copy", "-y"])
        .arg(output)
}

/// Cut `target` seconds out of `source` into a new scratch file.
///
/// `fixed_start` is used as-is when given. Otherwise the start is drawn at
/// random, avoiding `used` where the range allows. The returned sub-clip is
/// owned by the caller.
pub fn trim_segment<R: Rng + ?Sized>(
    tool: &dyn MediaTool,
    rng: &mut R,
    source: &Path,
    target: f64,
    fixed_start: Option<u64>,
    used: Option<&HashSet<u64>>,
    temp_dir: &Path,
) -> Result<SubClip> {
    let source_duration = tool.probe_duration(source)?;
    let right_end = last_valid_start(source_duration, target);

    if source_duration < target {
        warn!(
            "Background {} ({:.1}s) is shorter than required duration ({:.1}s)",
            source.display(),
            source_duration,
            target
        );
    }

    let start = match fixed_start {
        Some(start) => start,
        None => choose_start(rng, right_end, used),
    };

    let output = scratch_path(temp_dir, "mp4")?;
    if let Err(e) = tool.run(&trim_invocation(source, start, target, &output)) {
        remove_if_exists(&output);
        return Err(e);
    }

    debug!(
        "Trimmed {} -> {} (start: {}s, duration: {:.3}s)",
        source.display(),
        output.display(),
        start,
        target
    );

    Ok(SubClip {
        path: output,
        start,
        duration: target,
    })
}
