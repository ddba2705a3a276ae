/*!
 * Visual track: clip slots on the retimed timeline, Ken Burns motion for stills
 * and crossfade assembly.
 */

pub mod assembly;
pub mod durations;
pub mod motion;
pub mod offsets;

pub use assembly::{AssemblyManifest, AssemblyOutcome, ClipAssembler, ClipKind, ClipSource, PreparedClip, TransitionRung};
pub use durations::{ClipSlot, aligned_slots, clip_durations, one_to_one_slots};
pub use motion::{MotionParams, MotionType, configure_motion, random_motion, zoompan_filter};
pub use offsets::{AudioTrack, CrossfadePlan, FilterTopology, crossfade_offsets, crossfade_topology, crossfade_total};
