/*!
 * Timeline construction: expansion, padding, pauses, alignment and retiming.
 *
 * Everything in this module is pure computation over subtitle entries; no media
 * is touched here.
 */

pub mod aligner;
pub mod expander;
pub mod fuzzy;
pub mod padding;
pub mod pauses;
pub mod retimer;
pub mod stats;

pub use aligner::{AlignedWindow, Alignment, FuzzyAligner, MatchMethod};
pub use expander::SentenceExpander;
pub use fuzzy::TextMatcher;
pub use padding::apply_padding;
pub use pauses::{HEAD_INDEX, PauseCalculator, PauseKind, PauseMap};
pub use retimer::Retimer;
pub use stats::ExpansionStats;
