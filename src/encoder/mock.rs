/*!
 * Mock encoder for testing.
 *
 * The mock writes empty placeholder files and tracks a duration for every file it
 * produces, so pipeline code can be exercised without any media tooling:
 * - slices last exactly as requested, plus any injected drift
 * - silence lasts exactly as requested
 * - a concatenation lasts the sum of its inputs
 *
 * Failures can be injected per output file name and for the first N filter graph
 * attempts. Every call is recorded for assertions.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::encoder::{ConcatMode, Encoder, FilterGraphJob, SliceRequest, parse_concat_manifest};
use crate::errors::EncoderError;

/// A recorded encoder invocation
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderCall {
    Slice(SliceRequest),
    Concat { manifest: PathBuf, output: PathBuf, mode: ConcatMode },
    Probe(PathBuf),
    Silence { duration: f64, output: PathBuf },
    FilterGraph(FilterGraphJob),
}

#[derive(Debug, Default)]
struct MockState {
    durations: HashMap<PathBuf, f64>,
    calls: Vec<EncoderCall>,
    drift: HashMap<String, f64>,
    failing_outputs: Vec<String>,
    fail_concat: bool,
}

/// Deterministic in-process encoder
#[derive(Debug, Clone, Default)]
pub struct MockEncoder {
    state: Arc<Mutex<MockState>>,
    filter_attempts: Arc<AtomicUsize>,
    failing_filter_graphs: usize,
}

impl MockEncoder {
    /// Create a mock that succeeds at everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the duration of an input file such as the source voiceover
    pub fn with_duration<P: Into<PathBuf>>(self, path: P, seconds: f64) -> Self {
        self.state.lock().durations.insert(path.into(), seconds);
        self
    }

    /// Make slices whose output file name contains `pattern` drift by `seconds`
    pub fn with_slice_drift(self, pattern: &str, seconds: f64) -> Self {
        self.state.lock().drift.insert(pattern.to_string(), seconds);
        self
    }

    /// Fail any invocation whose output file name contains `pattern`
    pub fn with_failing_output(self, pattern: &str) -> Self {
        self.state.lock().failing_outputs.push(pattern.to_string());
        self
    }

    /// Fail every concatenation
    pub fn with_failing_concat(self) -> Self {
        self.state.lock().fail_concat = true;
        self
    }

    /// Fail the first `count` filter graph attempts
    pub fn with_failing_filter_graphs(mut self, count: usize) -> Self {
        self.failing_filter_graphs = count;
        self
    }

    /// All calls made so far, in call order
    pub fn calls(&self) -> Vec<EncoderCall> {
        self.state.lock().calls.clone()
    }

    /// Number of filter graph attempts made so far
    pub fn filter_attempts(&self) -> usize {
        self.filter_attempts.load(Ordering::SeqCst)
    }

    /// Duration tracked for a file, if the mock produced or knows it
    pub fn duration_of(&self, path: &Path) -> Option<f64> {
        self.state.lock().durations.get(path).copied()
    }

    fn record(&self, call: EncoderCall) {
        self.state.lock().calls.push(call);
    }

    fn check_output(&self, output: &Path) -> Result<(), EncoderError> {
        let name = file_name(output);
        let state = self.state.lock();
        if state.failing_outputs.iter().any(|p| name.contains(p.as_str())) {
            return Err(failure(&format!("{}: Invalid data found when processing input", name)));
        }
        Ok(())
    }

    async fn produce(&self, output: &Path, seconds: f64) -> Result<(), EncoderError> {
        tokio::fs::write(output, b"")
            .await
            .map_err(|e| failure(&format!("{}: {}", output.display(), e)))?;
        self.state.lock().durations.insert(output.to_path_buf(), seconds);
        Ok(())
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    async fn slice(&self, request: &SliceRequest) -> Result<(), EncoderError> {
        self.record(EncoderCall::Slice(request.clone()));
        self.check_output(&request.output)?;

        let name = file_name(&request.output);
        let drift = {
            let state = self.state.lock();
            state
                .drift
                .iter()
                .find(|(pattern, _)| name.contains(pattern.as_str()))
                .map(|(_, d)| *d)
                .unwrap_or(0.0)
        };
        self.produce(&request.output, (request.duration + drift).max(0.0)).await
    }

    async fn concat(&self, manifest: &Path, output: &Path, mode: ConcatMode) -> Result<(), EncoderError> {
        self.record(EncoderCall::Concat {
            manifest: manifest.to_path_buf(),
            output: output.to_path_buf(),
            mode,
        });
        if self.state.lock().fail_concat {
            return Err(failure("Error initializing complex filters"));
        }
        self.check_output(output)?;

        let content = tokio::fs::read_to_string(manifest)
            .await
            .map_err(|e| failure(&format!("{}: {}", manifest.display(), e)))?;

        let mut total = 0.0;
        for path in parse_concat_manifest(&content) {
            let duration = self
                .duration_of(&path)
                .ok_or_else(|| failure(&format!("{}: No such file or directory", path.display())))?;
            total += duration;
        }
        self.produce(output, total).await
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, EncoderError> {
        self.record(EncoderCall::Probe(path.to_path_buf()));
        self.duration_of(path).ok_or_else(|| EncoderError::Probe {
            path: path.to_path_buf(),
            message: "unknown file".to_string(),
        })
    }

    async fn generate_silence(&self, duration: f64, output: &Path) -> Result<(), EncoderError> {
        self.record(EncoderCall::Silence {
            duration,
            output: output.to_path_buf(),
        });
        self.check_output(output)?;
        self.produce(output, duration).await
    }

    async fn run_filter_graph(&self, job: &FilterGraphJob) -> Result<(), EncoderError> {
        self.record(EncoderCall::FilterGraph(job.clone()));
        let attempt = self.filter_attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failing_filter_graphs {
            return Err(failure(&format!("[{}] Filter xfade has an unconnected output", job.label)));
        }
        self.check_output(&job.output)?;
        self.produce(&job.output, 0.0).await
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn failure(stderr: &str) -> EncoderError {
    EncoderError::Failed {
        program: "mock".to_string(),
        status: Some(1),
        stderr: stderr.to_string(),
    }
}
