//! External media tool capability.
//!
//! Everything that shells out to ffprobe/ffmpeg goes through [`MediaTool`], so
//! the rest of the pipeline can be exercised with a test double that simulates
//! tool failures without invoking real binaries.

use serde::Deserialize;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// ============================================================================
// Probe Report
// ============================================================================

/// Subset of `ffprobe -print_format json -show_format -show_streams`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub format: Option<ProbeFormat>,
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    #[serde(default)]
    pub format_name: String,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    #[serde(default)]
    pub codec_type: String,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Disposition {
    #[serde(default)]
    pub attached_pic: u8,
}

impl ProbeStream {
    /// Image stream flagged as the attached front cover.
    pub fn is_front_cover(&self) -> bool {
        self.codec_type == "video" && self.disposition.attached_pic == 1
    }
}

// ============================================================================
// Remux Specification
// ============================================================================

/// One full remux invocation: source audio + new image -> output container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxSpec {
    pub source: PathBuf,
    pub artwork: PathBuf,
    pub output: PathBuf,
    /// Stream selector applied to the source input ("0:0" or "0:a")
    pub source_map: String,
    /// Codec directive for the image stream ("copy", "mjpeg", "png")
    pub image_codec: String,
    /// Disposition and metadata options, in order
    pub stream_options: Vec<(String, String)>,
    pub muxer: String,
    pub movflags: Option<String>,
}

impl RemuxSpec {
    /// ffmpeg argument list. Audio is always stream-copied.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-v".into(), "error".into()];
        args.push("-i".into());
        args.push(self.source.clone().into_os_string());
        args.push("-i".into());
        args.push(self.artwork.clone().into_os_string());
        args.extend(["-map", self.source_map.as_str(), "-map", "1:0"].map(OsString::from));
        args.extend(["-c:a", "copy", "-c:v", self.image_codec.as_str()].map(OsString::from));
        for (key, value) in &self.stream_options {
            args.push(key.into());
            args.push(value.into());
        }
        args.push("-f".into());
        args.push((&self.muxer).into());
        if let Some(flags) = &self.movflags {
            args.push("-movflags".into());
            args.push(flags.into());
        }
        args.push("-y".into());
        args.push(self.output.clone().into_os_string());
        args
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("could not run `{program} {arguments}`: {source}")]
    Spawn {
        program: String,
        arguments: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {status} for {}. Output: {diagnostics}", .path.display())]
    Failed {
        program: String,
        path: PathBuf,
        status: String,
        diagnostics: String,
    },

    #[error("could not parse `{program}` output for {}: {source}", .path.display())]
    Parse {
        program: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Capability
// ============================================================================

/// Probe and remux capability of an external media toolkit.
pub trait MediaTool {
    /// Container format and per-stream information for `path`.
    fn probe(&self, path: &Path) -> Result<ProbeReport, MediaError>;

    /// Run one remux invocation. Failures carry the tool's diagnostic output.
    fn remux(&self, spec: &RemuxSpec) -> Result<(), MediaError>;
}

/// ffprobe + ffmpeg found on `PATH` (or at explicit locations).
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new("ffprobe", "ffmpeg")
    }
}

impl FfmpegTool {
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Check both binaries can be executed (`<tool> -version`).
    pub fn ensure_available(&self) -> Result<(), MediaError> {
        for program in [&self.ffprobe, &self.ffmpeg] {
            let output = run(program, &["-version".into()])?;
            if !output.status.success() {
                return Err(MediaError::Failed {
                    program: program.display().to_string(),
                    path: program.clone(),
                    status: output.status.to_string(),
                    diagnostics: combined_output(&output),
                });
            }
        }
        Ok(())
    }
}

impl MediaTool for FfmpegTool {
    fn probe(&self, path: &Path) -> Result<ProbeReport, MediaError> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-print_format".into(),
            "json".into(),
            "-show_format".into(),
            "-show_streams".into(),
            path.as_os_str().to_owned(),
        ];
        let output = run(&self.ffprobe, &args)?;
        let program = self.ffprobe.display().to_string();
        if !output.status.success() {
            return Err(MediaError::Failed {
                program,
                path: path.to_path_buf(),
                status: output.status.to_string(),
                diagnostics: combined_output(&output),
            });
        }
        serde_json::from_slice(&output.stdout).map_err(|source| MediaError::Parse {
            program,
            path: path.to_path_buf(),
            source,
        })
    }

    fn remux(&self, spec: &RemuxSpec) -> Result<(), MediaError> {
        let output = run(&self.ffmpeg, &spec.to_args())?;
        if !output.status.success() {
            return Err(MediaError::Failed {
                program: self.ffmpeg.display().to_string(),
                path: spec.source.clone(),
                status: output.status.to_string(),
                diagnostics: combined_output(&output),
            });
        }
        Ok(())
    }
}

fn run(program: &Path, args: &[OsString]) -> Result<Output, MediaError> {
    Command::new(program)
        .args(args)
        .output()
        .map_err(|source| MediaError::Spawn {
            program: program.display().to_string(),
            arguments: args
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" "),
            source,
        })
}

/// stderr followed by stdout, lossily decoded and trimmed.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stdout);
    }
    text.trim().to_string()
}

// ============================================================================
// Test Double
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_report() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_name": "mp3", "codec_type": "audio",
                 "disposition": {"default": 0, "attached_pic": 0}},
                {"index": 1, "codec_name": "mjpeg", "codec_type": "video",
                 "disposition": {"default": 0, "attached_pic": 1}}
            ],
            "format": {"filename": "a.mp3", "format_name": "mp3", "duration": "215.432000"}
        }"#;
        let report: ProbeReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.streams.len(), 2);
        assert!(!report.streams[0].is_front_cover());
        assert!(report.streams[1].is_front_cover());
        let format = report.format.unwrap();
        assert_eq!(format.format_name, "mp3");
        assert_eq!(format.duration.as_deref(), Some("215.432000"));
    }

    #[test]
    fn test_parse_probe_report_missing_fields() {
        let report: ProbeReport = serde_json::from_str(r#"{"streams": [{"codec_type": "video"}]}"#).unwrap();
        assert!(report.format.is_none());
        assert!(!report.streams[0].is_front_cover());
    }

    #[test]
    fn test_remux_args_order() {
        let spec = RemuxSpec {
            source: PathBuf::from("song.m4a"),
            artwork: PathBuf::from("/tmp/cover.jpg"),
            output: PathBuf::from("song.m4a.tmp"),
            source_map: "0:a".to_string(),
            image_codec: "copy".to_string(),
            stream_options: vec![("-disposition:v:0".to_string(), "attached_pic".to_string())],
            muxer: "mp4".to_string(),
            movflags: Some("+faststart".to_string()),
        };
        let args: Vec<String> = spec
            .to_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-v", "error", "-i", "song.m4a", "-i", "/tmp/cover.jpg", "-map", "0:a", "-map",
                "1:0", "-c:a", "copy", "-c:v", "copy", "-disposition:v:0", "attached_pic", "-f",
                "mp4", "-movflags", "+faststart", "-y", "song.m4a.tmp",
            ]
        );
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let tool = FfmpegTool::new("/nonexistent/ffprobe-missing", "/nonexistent/ffmpeg-missing");
        let err = tool.ensure_available().unwrap_err();
        assert!(matches!(err, MediaError::Spawn { .. }));
        assert!(err.to_string().contains("ffprobe-missing"));
    }
}
