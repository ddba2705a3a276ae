/*!
 * ffmpeg / ffprobe subprocess encoder.
 *
 * Each operation is a single process invocation awaited on the tokio runtime.
 * A cancellation token is checked before every launch; a process that has already
 * started is allowed to finish. Outputs of failed or timed out invocations are
 * removed so no partial file is left behind.
 */

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use serde_json::Value;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::app_config::EncoderConfig;
use crate::encoder::{ConcatMode, Encoder, FilterGraphJob, MediaInput, SliceRequest};
use crate::errors::EncoderError;

/// Encoder backed by the ffmpeg command line tools
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    config: EncoderConfig,
    cancel: CancellationToken,
}

impl FfmpegEncoder {
    /// Create a new encoder from configuration
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop launching new processes once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn pcm_args(&self) -> Vec<String> {
        vec![
            "-vn".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            self.config.sample_rate.to_string(),
            "-ac".to_string(),
            "2".to_string(),
        ]
    }

    /// Arguments for a sample-accurate lossless cut
    pub fn slice_args(&self, request: &SliceRequest) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-i".to_string(),
            request.input.to_string_lossy().to_string(),
            "-ss".to_string(),
            format!("{:.3}", request.start),
            "-t".to_string(),
            format!("{:.3}", request.duration),
        ];
        args.extend(self.pcm_args());
        args.push(request.output.to_string_lossy().to_string());
        args
    }

    /// Arguments for a concat demuxer run
    pub fn concat_args(&self, manifest: &Path, output: &Path, mode: ConcatMode) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest.to_string_lossy().to_string(),
        ];
        match mode {
            ConcatMode::StreamCopy => args.extend(["-c".to_string(), "copy".to_string()]),
            ConcatMode::AudioEncode => args.extend([
                "-vn".to_string(),
                "-acodec".to_string(),
                "libmp3lame".to_string(),
                "-b:a".to_string(),
                self.config.audio_bitrate.clone(),
                "-ar".to_string(),
                self.config.sample_rate.to_string(),
            ]),
        }
        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Arguments for a filter graph job
    pub fn filter_graph_args(&self, job: &FilterGraphJob) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-hide_banner".to_string()];

        for input in &job.inputs {
            match input {
                MediaInput::File(path) => {
                    args.extend(["-i".to_string(), path.to_string_lossy().to_string()]);
                }
                MediaInput::Silence { duration } => args.extend([
                    "-f".to_string(),
                    "lavfi".to_string(),
                    "-t".to_string(),
                    format!("{:.3}", duration),
                    "-i".to_string(),
                    format!("anullsrc=r={}:cl=stereo", self.config.sample_rate),
                ]),
            }
        }

        if !job.filter_complex.is_empty() {
            args.extend(["-filter_complex".to_string(), job.filter_complex.clone()]);
        }
        for map in &job.maps {
            args.extend(["-map".to_string(), map.clone()]);
        }
        args.extend(job.output_args.iter().cloned());
        args.push(job.output.to_string_lossy().to_string());
        args
    }

    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
        output_file: Option<&Path>,
    ) -> Result<Vec<u8>, EncoderError> {
        if self.cancel.is_cancelled() {
            return Err(EncoderError::Cancelled);
        }

        debug!("Running {} {}", program, args.join(" "));

        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);
        let process = command.output();

        let result = match timeout {
            Some(limit) => tokio::select! {
                result = process => result,
                _ = tokio::time::sleep(limit) => {
                    remove_partial(output_file).await;
                    return Err(EncoderError::Timeout {
                        program: program.to_string(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => process.await,
        };

        let output = result.map_err(|e| EncoderError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            remove_partial(output_file).await;
            let err = EncoderError::Failed {
                program: program.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            error!("{}", err.summary());
            return Err(err);
        }

        Ok(output.stdout)
    }

    fn default_filter_timeout(&self) -> Option<Duration> {
        (self.config.filter_timeout_secs > 0).then(|| Duration::from_secs(self.config.filter_timeout_secs))
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn slice(&self, request: &SliceRequest) -> Result<(), EncoderError> {
        let args = self.slice_args(request);
        self.run(&self.config.ffmpeg_path, &args, None, Some(&request.output)).await?;
        Ok(())
    }

    async fn concat(&self, manifest: &Path, output: &Path, mode: ConcatMode) -> Result<(), EncoderError> {
        let args = self.concat_args(manifest, output, mode);
        self.run(&self.config.ffmpeg_path, &args, None, Some(output)).await?;
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, EncoderError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "json".to_string(),
            path.to_string_lossy().to_string(),
        ];
        let stdout = self.run(&self.config.ffprobe_path, &args, Some(Duration::from_secs(60)), None).await?;
        parse_probe_duration(&String::from_utf8_lossy(&stdout), path)
    }

    async fn generate_silence(&self, duration: f64, output: &Path) -> Result<(), EncoderError> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("anullsrc=r={}:cl=stereo", self.config.sample_rate),
            "-t".to_string(),
            format!("{:.3}", duration),
        ];
        args.extend(self.pcm_args());
        args.push(output.to_string_lossy().to_string());
        self.run(&self.config.ffmpeg_path, &args, None, Some(output)).await?;
        Ok(())
    }

    async fn run_filter_graph(&self, job: &FilterGraphJob) -> Result<(), EncoderError> {
        let args = self.filter_graph_args(job);
        let timeout = job.timeout.or_else(|| self.default_filter_timeout());
        debug!("Filter graph job '{}' with {} inputs", job.label, job.inputs.len());
        self.run(&self.config.ffmpeg_path, &args, timeout, Some(&job.output)).await?;
        Ok(())
    }
}

/// Extract `format.duration` from ffprobe JSON output
pub fn parse_probe_duration(stdout: &str, path: &Path) -> Result<f64, EncoderError> {
    let probe_error = |message: String| EncoderError::Probe {
        path: path.to_path_buf(),
        message,
    };

    let json: Value = serde_json::from_str(stdout).map_err(|e| probe_error(format!("invalid JSON: {}", e)))?;
    let duration = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .ok_or_else(|| probe_error("no format duration reported".to_string()))?;

    let seconds = match duration {
        Value::String(s) => s.trim().parse::<f64>().map_err(|e| probe_error(format!("bad duration {:?}: {}", s, e)))?,
        Value::Number(n) => n.as_f64().ok_or_else(|| probe_error(format!("bad duration {}", n)))?,
        other => return Err(probe_error(format!("unexpected duration value {}", other))),
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(probe_error(format!("invalid duration {}", seconds)));
    }
    Ok(seconds)
}

async fn remove_partial(path: Option<&Path>) {
    if let Some(path) = path {
        if tokio::fs::remove_file(path).await.is_ok() {
            debug!("Removed partial output {:?}", path);
        }
    }
}
