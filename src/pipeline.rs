use crate::config::Config;
use crate::error::{Result, SplitcapError};
use crate::files::{list_media_files, move_file, remove_if_exists, unique_path, unix_timestamp};
use crate::media::{extract_audio, MediaTool};
use crate::subtitle::CaptionBuilder;
use crate::transcribe::Transcriber;
use crate::video::{burn_captions, Composer};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Where a video is in its run. Failures are reported with the stage they
/// happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    SelectingBackground,
    Composing,
    ExtractingAudio,
    Transcribing,
    BuildingCaptions,
    BurningCaptions,
    Finalizing,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::SelectingBackground => "selecting background",
            RunStage::Composing => "composing",
            RunStage::ExtractingAudio => "extracting audio",
            RunStage::Transcribing => "transcribing",
            RunStage::BuildingCaptions => "building captions",
            RunStage::BurningCaptions => "burning captions",
            RunStage::Finalizing => "finalizing",
            RunStage::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// How one source video ended.
#[derive(Debug)]
pub enum VideoOutcome {
    Completed {
        output: PathBuf,
    },
    /// Finished without captions because the audio could not be extracted.
    Degraded {
        output: PathBuf,
        reason: String,
    },
    Failed {
        stage: RunStage,
        error: SplitcapError,
    },
}

impl VideoOutcome {
    pub fn output(&self) -> Option<&Path> {
        match self {
            VideoOutcome::Completed { output } | VideoOutcome::Degraded { output, .. } => {
                Some(output)
            }
            VideoOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct VideoReport {
    pub source: PathBuf,
    pub outcome: VideoOutcome,
    pub elapsed: Duration,
}

/// Result of a whole batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub videos: Vec<VideoReport>,
    pub total_time: Duration,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Completed { .. }))
    }

    pub fn degraded(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Degraded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &VideoReport> {
        self.videos
            .iter()
            .filter(|v| matches!(v.outcome, VideoOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&VideoOutcome) -> bool) -> usize {
        self.videos.iter().filter(|v| pred(&v.outcome)).count()
    }
}

/// Intermediate files of one run, removed when the run ends either way.
#[derive(Default)]
struct RunArtifacts {
    paths: Vec<PathBuf>,
}

impl RunArtifacts {
    fn track(&mut self, path: &Path) {
        self.paths.push(path.to_path_buf());
    }

    fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            remove_if_exists(&path);
        }
    }
}

impl Drop for RunArtifacts {
    fn drop(&mut self) {
        if !self.paths.is_empty() {
            debug!("Cleaning up {} intermediate files", self.paths.len());
        }
        self.cleanup();
    }
}

struct StageFailure {
    stage: RunStage,
    error: SplitcapError,
}

fn at(stage: RunStage) -> impl FnOnce(SplitcapError) -> StageFailure {
    move |error| StageFailure { stage, error }
}

/// Drives every source video through compose, caption and finalize.
pub struct Pipeline {
    config: Config,
    tool: Box<dyn MediaTool>,
    transcriber: Option<Box<dyn Transcriber>>,
    captions: CaptionBuilder,
    rng: StdRng,
    used_offsets: HashMap<PathBuf, HashSet<u64>>,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config, tool: Box<dyn MediaTool>) -> Self {
        Self {
            config,
            tool,
            transcriber: None,
            captions: CaptionBuilder::default(),
            rng: StdRng::from_entropy(),
            used_offsets: HashMap::new(),
            show_progress: false,
        }
    }

    /// Transcriber used when captions are enabled.
    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_caption_builder(mut self, captions: CaptionBuilder) -> Self {
        self.captions = captions;
        self
    }

    /// Make background and offset selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Process every video in the source folder, one at a time.
    ///
    /// Only batch-wide problems (no background clips, unreadable folders,
    /// captions enabled without a transcriber) return an error. Failures of
    /// individual videos are logged and recorded in the report.
    pub async fn run_batch(&mut self) -> Result<BatchReport> {
        let started = Instant::now();

        let backgrounds = list_media_files(&self.config.background_dir)?;
        if backgrounds.is_empty() {
            return Err(SplitcapError::EmptyBackgroundPool(
                self.config.background_dir.clone(),
            ));
        }
        if self.config.add_subtitles && self.transcriber.is_none() {
            return Err(SplitcapError::Config(
                "Captions are enabled but no transcriber is configured".to_string(),
            ));
        }

        let sources = list_media_files(&self.config.source_dir)?;
        info!(
            "Found {} source videos and {} background clips",
            sources.len(),
            backgrounds.len()
        );

        let progress = self.show_progress.then(|| {
            let pb = ProgressBar::new(sources.len() as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        });

        let mut report = BatchReport::default();
        for source in sources {
            if let Some(pb) = &progress {
                pb.set_message(display_name(&source));
            }

            let video = self.process_video(&source, &backgrounds).await;
            report.videos.push(video);

            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message(format!("✓ {} videos processed", report.videos.len()));
        }

        report.total_time = started.elapsed();
        Ok(report)
    }

    /// Run one video through every stage. Never fails: errors end up in the
    /// returned report.
    pub async fn process_video(&mut self, source: &Path, backgrounds: &[PathBuf]) -> VideoReport {
        let started = Instant::now();
        let mut artifacts = RunArtifacts::default();

        info!("Processing {}", source.display());
        let outcome = match self.run_stages(source, backgrounds, &mut artifacts).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                error!(
                    video = %source.display(),
                    kind = failure.error.kind(),
                    stage = %failure.stage,
                    "Video failed: {}",
                    failure.error
                );
                VideoOutcome::Failed {
                    stage: failure.stage,
                    error: failure.error,
                }
            }
        };
        artifacts.cleanup();

        match &outcome {
            VideoOutcome::Completed { output } => {
                info!("Finished {} -> {}", source.display(), output.display())
            }
            VideoOutcome::Degraded { output, reason } => warn!(
                "Finished {} without captions -> {} ({})",
                source.display(),
                output.display(),
                reason
            ),
            VideoOutcome::Failed { .. } => {}
        }

        VideoReport {
            source: source.to_path_buf(),
            outcome,
            elapsed: started.elapsed(),
        }
    }

    async fn run_stages(
        &mut self,
        source: &Path,
        backgrounds: &[PathBuf],
        artifacts: &mut RunArtifacts,
    ) -> std::result::Result<VideoOutcome, StageFailure> {
        let config = &self.config;

        // ═══════════════════════════════════════════════════════════════════
        // Background selection
        // ═══════════════════════════════════════════════════════════════════
        let background = backgrounds
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| SplitcapError::EmptyBackgroundPool(config.background_dir.clone()))
            .map_err(at(RunStage::SelectingBackground))?;
        debug!("Selected background {}", background.display());

        // ═══════════════════════════════════════════════════════════════════
        // Composition
        // ═══════════════════════════════════════════════════════════════════
        let composer = Composer::new(self.tool.as_ref(), config.video_codec, &config.temp_dir);
        let composition = composer
            .compose(
                &mut self.rng,
                source,
                &background,
                self.used_offsets.get(&background),
                &config.temp_dir,
            )
            .map_err(at(RunStage::Composing))?;
        artifacts.track(&composition.output);
        self.used_offsets
            .entry(background)
            .or_default()
            .insert(composition.background_start);

        if !config.add_subtitles {
            let output = self
                .finalize(source, &composition.output, artifacts)
                .map_err(at(RunStage::Finalizing))?;
            return Ok(VideoOutcome::Completed { output });
        }

        // ═══════════════════════════════════════════════════════════════════
        // Audio extraction (the only stage allowed to degrade)
        // ═══════════════════════════════════════════════════════════════════
        let audio = match extract_audio(self.tool.as_ref(), &composition.output, &config.temp_dir)
        {
            Ok(audio) => audio,
            Err(e) => {
                warn!(
                    video = %source.display(),
                    "Audio extraction failed, continuing without captions: {}",
                    e
                );
                let output = self
                    .finalize(source, &composition.output, artifacts)
                    .map_err(at(RunStage::Finalizing))?;
                return Ok(VideoOutcome::Degraded {
                    output,
                    reason: e.to_string(),
                });
            }
        };
        artifacts.track(&audio);

        // ═══════════════════════════════════════════════════════════════════
        // Transcription and captions
        // ═══════════════════════════════════════════════════════════════════
        let transcriber = self
            .transcriber
            .as_deref()
            .ok_or_else(|| SplitcapError::Config("No transcriber configured".to_string()))
            .map_err(at(RunStage::Transcribing))?;
        info!("Transcribing {} with {}", audio.display(), transcriber.name());
        let words = transcriber
            .transcribe(&audio)
            .await
            .map_err(at(RunStage::Transcribing))?;
        info!("Transcribed {} words", words.len());

        let subtitles = self
            .captions
            .write(&words, &config.temp_dir)
            .map_err(at(RunStage::BuildingCaptions))?;
        artifacts.track(&subtitles);

        let captioned = burn_captions(
            self.tool.as_ref(),
            config.video_codec,
            &composition.output,
            &subtitles,
            &config.temp_dir,
        )
        .map_err(at(RunStage::BurningCaptions))?;
        artifacts.track(&captioned);

        let output = self
            .finalize(source, &captioned, artifacts)
            .map_err(at(RunStage::Finalizing))?;
        Ok(VideoOutcome::Completed { output })
    }

    /// Move `artifact` into the output folder, drop intermediates, then
    /// delete the source video.
    fn finalize(
        &self,
        source: &Path,
        artifact: &Path,
        artifacts: &mut RunArtifacts,
    ) -> Result<PathBuf> {
        let destination = unique_path(
            &self.config.output_dir,
            &unix_timestamp().to_string(),
            "mp4",
        )?;
        move_file(artifact, &destination)?;
        artifacts.cleanup();

        if let Err(e) = std::fs::remove_file(source) {
            if source.exists() {
                warn!("Failed to delete source video {}: {}", source.display(), e);
            }
        }

        debug!("{} reached stage: {}", source.display(), RunStage::Done);
        Ok(destination)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Print a summary of the batch.
pub fn print_summary(report: &BatchReport) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                        Batch Complete                         ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Videos:     {}", report.videos.len());
    println!("  Completed:  {}", report.completed());
    println!("  Degraded:   {}", report.degraded());
    println!("  Failed:     {}", report.failed());
    println!("  Total:      {:.2}s", report.total_time.as_secs_f64());

    let mut failures = report.failures().peekable();
    if failures.peek().is_some() {
        println!();
        println!("  Failures:");
        for video in failures {
            if let VideoOutcome::Failed { stage, error } = &video.outcome {
                println!("    {} ({}): {}", display_name(&video.source), stage, error);
            }
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_stage_display() {
        assert_eq!(RunStage::Composing.to_string(), "composing");
        assert_eq!(RunStage::BurningCaptions.to_string(), "burning captions");
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport {
            videos: vec![
                VideoReport {
                    source: PathBuf::from("a.mp4"),
                    outcome: VideoOutcome::Completed {
                        output: PathBuf::from("out/1.mp4"),
                    },
                    elapsed: Duration::from_secs(1),
                },
                VideoReport {
                    source: PathBuf::from("b.mp4"),
                    outcome: VideoOutcome::Degraded {
                        output: PathBuf::from("out/2.mp4"),
                        reason: "no audio".to_string(),
                    },
                    elapsed: Duration::from_secs(1),
                },
                VideoReport {
                    source: PathBuf::from("c.mp4"),
                    outcome: VideoOutcome::Failed {
                        stage: RunStage::Transcribing,
                        error: SplitcapError::Transcription("boom".to_string()),
                    },
                    elapsed: Duration::from_secs(1),
                },
            ],
            total_time: Duration::from_secs(3),
        };

        assert_eq!(report.completed(), 1);
        assert_eq!(report.degraded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.failures().map(|v| v.source.clone()).collect::<Vec<_>>(),
            vec![PathBuf::from("c.mp4")]
        );
        assert_eq!(report.videos[1].outcome.output(), Some(Path::new("out/2.mp4")));
    }

    #[test]
    fn test_run_artifacts_cleanup_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.ass");
        std::fs::write(&a, b"").unwrap();
        std::fs::write(&b, b"").unwrap();

        {
            let mut artifacts = RunArtifacts::default();
            artifacts.track(&a);
            artifacts.track(&b);
            artifacts.track(&dir.path().join("never-created.mp3"));
        }

        assert!(!a.exists());
        assert!(!b.exists());
    }
}
