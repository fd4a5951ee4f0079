//! FFmpeg and melt command builders and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{StderrProgressParser, ToolProgress};

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// External program that renders a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Ffmpeg,
    Melt,
}

impl Tool {
    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Melt => "melt",
        }
    }

    /// Resolve the binary in PATH.
    pub fn locate(&self) -> MediaResult<PathBuf> {
        which::which(self.binary_name()).map_err(|_| MediaError::ToolNotFound(self.binary_name()))
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Single-input ffmpeg transcode, always overwriting its output.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Source resource (path or URI)
    input: String,
    /// Pending output file
    output: PathBuf,
    /// Everything between `-i <input>` and `-y <output>`
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl Into<String>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.into(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Append one raw argument after the input.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an option with its value.
    pub fn option(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.output_arg(name).output_arg(value)
    }

    /// Select a stream with `-map`.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.option("-map", spec)
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.option("-vf", filter)
    }

    /// Set output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.option("-f", format)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.option("-codec:v", codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.option("-codec:a", codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.option("-b:a", bitrate)
    }

    /// Set pixel format.
    pub fn pixel_format(self, pix_fmt: impl Into<String>) -> Self {
        self.option("-pix_fmt", pix_fmt)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.option("-crf", crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.option("-preset", preset)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// `-loglevel <level> -i <input> <output args> -y <output>`
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-loglevel".to_string(),
            self.log_level.clone(),
            "-i".to_string(),
            self.input.clone(),
        ];
        args.extend(self.output_args.iter().cloned());
        args.push("-y".to_string());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Builder for melt (MLT command line) render commands.
#[derive(Debug, Clone)]
pub struct MeltCommand {
    /// Producer resource
    resource: String,
    /// Output file path
    output: PathBuf,
    /// Consumer service used for the output
    consumer: String,
    /// MLT profile name
    profile: Option<String>,
    /// Properties applied to the producer
    producer_args: Vec<String>,
    /// Properties applied to the consumer
    consumer_args: Vec<String>,
    verbose: bool,
}

impl MeltCommand {
    /// Create a new melt command rendering `resource` with the avformat consumer.
    pub fn new(resource: impl Into<String>, output: impl AsRef<Path>) -> Self {
        Self {
            resource: resource.into(),
            output: output.as_ref().to_path_buf(),
            consumer: "avformat".to_string(),
            profile: None,
            producer_args: Vec::new(),
            consumer_args: Vec::new(),
            verbose: false,
        }
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Add a `key=value` producer property.
    pub fn producer_property(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        self.producer_args.push(format!("{key}={value}"));
        self
    }

    /// Add a `key=value` consumer property.
    pub fn consumer_property(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        self.consumer_args.push(format!("{key}={value}"));
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.verbose {
            args.push("-verbose".to_string());
        }
        if let Some(profile) = &self.profile {
            args.push("-profile".to_string());
            args.push(profile.clone());
        }
        args.push(self.resource.clone());
        args.extend(self.producer_args.iter().cloned());
        args.push("-consumer".to_string());
        args.push(format!("{}:{}", self.consumer, self.output.to_string_lossy()));
        args.extend(self.consumer_args.iter().cloned());
        args
    }
}

/// Spawns a tool, streams its stderr into progress updates and enforces
/// an optional timeout. The child is killed when the run is dropped.
#[derive(Debug)]
pub struct ToolRunner {
    timeout_secs: Option<u64>,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run `tool` to completion, reporting parsed progress to `progress_callback`.
    pub async fn run_with_progress<F>(&self, tool: Tool, args: &[String], progress_callback: F) -> MediaResult<()>
    where
        F: Fn(ToolProgress) + Send + 'static,
    {
        let binary = tool.locate()?;
        debug!("Running {}: {} {}", tool, binary.display(), args.join(" "));

        let mut child = Command::new(&binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or(MediaError::StderrUnavailable(tool.binary_name()))?;
        let mut reader = BufReader::new(stderr).lines();

        // Parse progress and keep the stderr tail for error reports
        let progress_handle = tokio::spawn(async move {
            let mut parser = StderrProgressParser::new();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(progress) = parser.feed(&line) {
                    progress_callback(progress);
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            Vec::from(tail).join("\n")
        });

        let status = self.wait_for_completion(&mut child).await;
        let stderr_tail = progress_handle.await.unwrap_or_default();
        let status = status?;

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ToolExited {
                tool: tool.binary_name(),
                exit_code: status.code(),
                stderr_tail,
            })
        }
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let timeout = async {
            match self.timeout_secs {
                Some(secs) => tokio::time::sleep(std::time::Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = timeout => {
                let secs = self.timeout_secs.unwrap_or_default();
                warn!("Tool timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                return Err(MediaError::Timeout(secs));
            }
        };

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_command_order() {
        let cmd = FfmpegCommand::new("/media/a.mov", "/cache/H.pending.mp4")
            .log_level("verbose")
            .option("-max_muxing_queue_size", "9999")
            .map("0:v?")
            .video_codec("libx264")
            .crf(23);

        let args = cmd.build_args();
        assert_eq!(&args[..4], &["-loglevel", "verbose", "-i", "/media/a.mov"]);
        assert_eq!(args[args.len() - 2], "-y");
        assert_eq!(args[args.len() - 1], "/cache/H.pending.mp4");
        assert!(args.iter().any(|a| a == "libx264"));
        assert!(!args.iter().any(|a| a == "-preset"));
    }

    #[test]
    fn test_melt_command() {
        let args = MeltCommand::new("/media/still.png", "/cache/H.pending.jpg")
            .verbose()
            .profile("square_pal")
            .producer_property("out", 0)
            .consumer_property("width", 720)
            .build_args();

        assert_eq!(
            args,
            vec![
                "-verbose",
                "-profile",
                "square_pal",
                "/media/still.png",
                "out=0",
                "-consumer",
                "avformat:/cache/H.pending.jpg",
                "width=720",
            ]
        );
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(Tool::Ffmpeg.to_string(), "ffmpeg");
        assert_eq!(Tool::Melt.binary_name(), "melt");
    }
}
