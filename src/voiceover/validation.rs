use std::fmt;

use serde::Serialize;

use crate::voiceover::slicer::VoSegment;

/// How far a single segment landed from its requested duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftClass {
    /// Within tolerance
    Ok,
    /// Over tolerance, excluded
    Drifted,
    /// Over the hard ceiling, excluded
    Severe,
    /// Not cut or not measurable
    Failed,
}

/// Classify one segment against the tolerance and ceiling (seconds)
pub fn classify(segment: &VoSegment, tolerance: f64, ceiling: f64) -> DriftClass {
    if !segment.was_measured() {
        DriftClass::Failed
    } else if segment.drift > ceiling {
        DriftClass::Severe
    } else if segment.drift > tolerance {
        DriftClass::Drifted
    } else {
        DriftClass::Ok
    }
}

/// Quality summary of a slicing and stitching run.
///
/// Informational only: invalid segments were already excluded and gap-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub ok: usize,
    pub drifted: usize,
    pub severe: usize,
    pub failed: usize,
    pub max_drift: f64,
    pub mean_drift: f64,
    /// Share of segments within tolerance, 0.0-1.0
    pub accuracy: f64,
    /// Entries replaced by silence in the stitched track
    pub filled_entries: Vec<usize>,
    /// Length the retimed timeline expects
    pub expected_duration: f64,
    /// Length of the stitched track as measured, if it could be probed
    pub measured_duration: Option<f64>,
}

impl ValidationReport {
    pub fn from_segments(
        segments: &[VoSegment],
        tolerance: f64,
        ceiling: f64,
        filled_entries: Vec<usize>,
        expected_duration: f64,
        measured_duration: Option<f64>,
    ) -> Self {
        let mut report = Self {
            total: segments.len(),
            ok: 0,
            drifted: 0,
            severe: 0,
            failed: 0,
            max_drift: 0.0,
            mean_drift: 0.0,
            accuracy: 0.0,
            filled_entries,
            expected_duration,
            measured_duration,
        };

        let mut drift_sum = 0.0;
        let mut measured = 0usize;
        for segment in segments {
            match classify(segment, tolerance, ceiling) {
                DriftClass::Ok => report.ok += 1,
                DriftClass::Drifted => report.drifted += 1,
                DriftClass::Severe => report.severe += 1,
                DriftClass::Failed => {
                    report.failed += 1;
                    continue;
                }
            }
            measured += 1;
            drift_sum += segment.drift;
            report.max_drift = report.max_drift.max(segment.drift);
        }

        if measured > 0 {
            report.mean_drift = drift_sum / measured as f64;
        }
        if report.total > 0 {
            report.accuracy = report.ok as f64 / report.total as f64;
        }
        report
    }

    /// Difference between measured and expected stitched length
    pub fn stitch_drift(&self) -> Option<f64> {
        self.measured_duration.map(|m| (m - self.expected_duration).abs())
    }

    /// Whether every segment made it into the track untouched
    pub fn is_clean(&self) -> bool {
        self.ok == self.total
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} segments ok ({:.1}%), {} drifted, {} severe, {} failed, drift max {:.0}ms mean {:.0}ms",
            self.ok,
            self.total,
            self.accuracy * 100.0,
            self.drifted,
            self.severe,
            self.failed,
            self.max_drift * 1000.0,
            self.mean_drift * 1000.0
        )?;
        if let Some(measured) = self.measured_duration {
            write!(f, ", stitched {:.3}s vs expected {:.3}s", measured, self.expected_duration)?;
        }
        Ok(())
    }
}
