use crate::error::{Result, SplitcapError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the config file looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "splitcap.toml";

/// Video encoder handed to ffmpeg for every re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    #[serde(rename = "h264_videotoolbox")]
    VideoToolbox,
    #[serde(rename = "h264_amf")]
    Amf,
    #[serde(rename = "libx264")]
    Libx264,
}

impl VideoCodec {
    /// Hardware encoder for the current OS family, software x264 otherwise.
    ///
    /// The Windows choice only works on AMD GPUs; override it in the config
    /// file on other hardware.
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            VideoCodec::VideoToolbox
        } else if cfg!(target_os = "windows") {
            VideoCodec::Amf
        } else {
            VideoCodec::Libx264
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::VideoToolbox => "h264_videotoolbox",
            VideoCodec::Amf => "h264_amf",
            VideoCodec::Libx264 => "libx264",
        }
    }
}

impl Default for VideoCodec {
    fn default() -> Self {
        Self::for_platform()
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "h264_videotoolbox" | "videotoolbox" => Ok(VideoCodec::VideoToolbox),
            "h264_amf" | "amf" => Ok(VideoCodec::Amf),
            "libx264" | "x264" => Ok(VideoCodec::Libx264),
            _ => Err(format!(
                "Unknown video codec: {}. Use 'h264_videotoolbox', 'h264_amf' or 'libx264'",
                s
            )),
        }
    }
}

/// Interpret a boolean-ish environment value.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inbox of videos to process. Each one is deleted after it succeeds.
    pub source_dir: PathBuf,
    /// Pool of background clips for the lower half of the composite.
    pub background_dir: PathBuf,
    /// Scratch space for intermediates.
    pub temp_dir: PathBuf,
    /// Destination of finished videos.
    pub output_dir: PathBuf,
    /// ASS header template copied verbatim into every caption document.
    pub ass_header_path: PathBuf,
    pub add_subtitles: bool,
    pub video_codec: VideoCodec,
    pub openai_api_key: Option<String>,
    /// ISO 639-1 hint passed to the transcription service.
    pub language: Option<String>,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source_videos"),
            background_dir: PathBuf::from("bottom_videos"),
            temp_dir: PathBuf::from("temp"),
            output_dir: PathBuf::from("result_videos"),
            ass_header_path: PathBuf::from("resource/ass_header.txt"),
            add_subtitles: true,
            video_codec: VideoCodec::for_platform(),
            openai_api_key: None,
            language: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, `./splitcap.toml` or the user
    /// config dir (first one found), then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit)? {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                let contents = std::fs::read_to_string(&path)?;
                toml::from_str::<Config>(&contents).map_err(|e| {
                    SplitcapError::Config(format!("{}: {e}", path.display()))
                })?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(flag) = lookup("ADD_SUBTITLES") {
            self.add_subtitles = parse_flag(&flag);
        }
        if let Some(codec) = lookup("SPLITCAP_VIDEO_CODEC") {
            if let Ok(c) = codec.parse() {
                self.video_codec = c;
            }
        }
        if let Some(language) = lookup("SPLITCAP_LANGUAGE") {
            self.language = Some(language);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.add_subtitles && self.openai_api_key.is_none() {
            return Err(SplitcapError::Config(
                "OPENAI_API_KEY not set. Export it or disable captions with ADD_SUBTITLES=false"
                    .to_string(),
            ));
        }

        let dirs = [
            &self.source_dir,
            &self.background_dir,
            &self.temp_dir,
            &self.output_dir,
        ];
        if dirs.iter().any(|d| d.as_os_str().is_empty()) {
            return Err(SplitcapError::Config(
                "Folder paths must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Create the four working folders if they don't exist.
    pub fn ensure_folders_exist(&self) -> Result<()> {
        for folder in [
            &self.background_dir,
            &self.output_dir,
            &self.source_dir,
            &self.temp_dir,
        ] {
            std::fs::create_dir_all(folder)?;
            info!("Ensured folder exists: {}", folder.display());
        }
        Ok(())
    }

    fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(SplitcapError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(Some(local));
        }

        Ok(Self::config_file_path().filter(|p| p.exists()))
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("splitcap").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_codec_parsing() {
        assert_eq!(
            "libx264".parse::<VideoCodec>().unwrap(),
            VideoCodec::Libx264
        );
        assert_eq!("AMF".parse::<VideoCodec>().unwrap(), VideoCodec::Amf);
        assert_eq!(
            "h264_videotoolbox".parse::<VideoCodec>().unwrap(),
            VideoCodec::VideoToolbox
        );
        assert!("hevc".parse::<VideoCodec>().is_err());
    }

    #[test]
    fn test_platform_codec() {
        let codec = VideoCodec::for_platform();
        if cfg!(target_os = "linux") {
            assert_eq!(codec, VideoCodec::Libx264);
        }
        assert_eq!(codec.to_string(), codec.as_str());
    }

    #[test]
    fn test_parse_flag() {
        for v in ["true", "1", "yes", "on", " ON "] {
            assert!(parse_flag(v), "{v} should be true");
        }
        for v in ["false", "0", "no", "off", ""] {
            assert!(!parse_flag(v), "{v} should be false");
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source_dir, PathBuf::from("source_videos"));
        assert_eq!(config.background_dir, PathBuf::from("bottom_videos"));
        assert_eq!(config.output_dir, PathBuf::from("result_videos"));
        assert!(config.add_subtitles);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-test"),
            ("ADD_SUBTITLES", "off"),
            ("SPLITCAP_VIDEO_CODEC", "amf"),
            ("SPLITCAP_LANGUAGE", "en"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert!(!config.add_subtitles);
        assert_eq!(config.video_codec, VideoCodec::Amf);
        assert_eq!(config.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_validate_missing_api_key() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.add_subtitles = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            source_dir = "inbox"
            video_codec = "libx264"
            add_subtitles = false
            "#,
        )
        .unwrap();

        assert_eq!(config.source_dir, PathBuf::from("inbox"));
        assert_eq!(config.temp_dir, PathBuf::from("temp"));
        assert_eq!(config.video_codec, VideoCodec::Libx264);
        assert!(!config.add_subtitles);
    }

    #[test]
    fn test_load_explicit_missing() {
        let result = Config::load(Some(Path::new("/nonexistent/splitcap.toml")));
        assert!(matches!(result, Err(SplitcapError::Config(_))));
    }

    #[test]
    fn test_ensure_folders_exist() {
        let root = tempfile::tempdir().unwrap();
        let config = Config {
            source_dir: root.path().join("src"),
            background_dir: root.path().join("bg"),
            temp_dir: root.path().join("tmp"),
            output_dir: root.path().join("out"),
            ..Config::default()
        };

        config.ensure_folders_exist().unwrap();
        assert!(config.source_dir.is_dir());
        assert!(config.background_dir.is_dir());
        assert!(config.temp_dir.is_dir());
        assert!(config.output_dir.is_dir());
    }
}
