/*!
 * Crossfade offsets and filter-graph topology for N-way clip transitions.
 *
 * Once a clip overlaps its successor by the transition length `d`, it contributes
 * `duration - d` to the timeline. The transition into clip `i` therefore starts at
 * the sum of `duration[k] - d` for every earlier clip `k`.
 */

use crate::app_config::CrossfadeConfig;

/// Start offset of the transition into each clip; the first entry is always 0.0
pub fn crossfade_offsets(durations: &[f64], transition: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(durations.len());
    let mut accumulated: f64 = 0.0;

    for (i, duration) in durations.iter().enumerate() {
        if i == 0 {
            offsets.push(0.0);
        } else {
            offsets.push(accumulated.max(0.0));
        }
        accumulated += duration - transition;
    }

    offsets
}

/// Length of the chained result
pub fn crossfade_total(durations: &[f64], transition: f64) -> f64 {
    if durations.is_empty() {
        return 0.0;
    }
    let overlaps = transition * (durations.len() - 1) as f64;
    (durations.iter().sum::<f64>() - overlaps).max(0.0)
}

/// Offsets and total length for one clip sequence
#[derive(Debug, Clone, PartialEq)]
pub struct CrossfadePlan {
    pub durations: Vec<f64>,
    pub transition: f64,
    pub offsets: Vec<f64>,
    pub total_duration: f64,
}

impl CrossfadePlan {
    pub fn new(durations: &[f64], transition: f64) -> Self {
        Self {
            durations: durations.to_vec(),
            transition,
            offsets: crossfade_offsets(durations, transition),
            total_duration: crossfade_total(durations, transition),
        }
    }

    pub fn clip_count(&self) -> usize {
        self.durations.len()
    }
}

/// Where the audio of a crossfaded sequence comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioTrack {
    /// Chain the clips' own audio with `acrossfade`
    Crossfade,
    /// Use the generated silence at the given input index
    Silence { input: usize },
}

/// A filter graph plus the stream selectors to map
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTopology {
    pub filter_complex: String,
    pub maps: Vec<String>,
}

/// Build the video xfade chain (and optionally the audio acrossfade chain).
///
/// Clip `i` is expected at input index `i`. Every clip is trimmed to its planned
/// duration and normalized to the output size and frame rate before chaining.
pub fn crossfade_topology(plan: &CrossfadePlan, config: &CrossfadeConfig, audio: AudioTrack) -> FilterTopology {
    let (w, h) = (config.width, config.height);
    let mut filters = Vec::new();

    for (i, duration) in plan.durations.iter().enumerate() {
        filters.push(format!(
            "[{i}:v]trim=duration={duration:.3},setpts=PTS-STARTPTS,scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[v{i}]",
            fps = config.fps
        ));
    }

    let mut video = "v0".to_string();
    for i in 1..plan.clip_count() {
        let out = if i + 1 == plan.clip_count() { "vout".to_string() } else { format!("vx{}", i) };
        filters.push(format!(
            "[{}][v{}]xfade=transition={}:duration={:.3}:offset={:.3}[{}]",
            video, i, config.transition, plan.transition, plan.offsets[i], out
        ));
        video = out;
    }

    let mut maps = vec![format!("[{}]", video)];

    match audio {
        AudioTrack::Crossfade => {
            for (i, duration) in plan.durations.iter().enumerate() {
                filters.push(format!("[{i}:a]atrim=duration={duration:.3},asetpts=PTS-STARTPTS[a{i}]"));
            }
            let mut current = "a0".to_string();
            for i in 1..plan.clip_count() {
                let out = if i + 1 == plan.clip_count() { "aout".to_string() } else { format!("ax{}", i) };
                filters.push(format!(
                    "[{}][a{}]acrossfade=d={:.3}:c1=tri:c2=tri[{}]",
                    current, i, plan.transition, out
                ));
                current = out;
            }
            maps.push(format!("[{}]", current));
        }
        AudioTrack::Silence { input } => maps.push(format!("{}:a", input)),
    }

    FilterTopology {
        filter_complex: filters.join(";"),
        maps,
    }
}
