/*!
 * Ken Burns motion for still images.
 *
 * A motion is a start and end zoom plus a start and end focus point. The focus is
 * a fraction (0.0-1.0) of the free space left once the zoomed frame is cropped, so
 * 0.5 keeps the frame centred.
 */

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Zoom used by pans so there is room to move
const PAN_ZOOM: f64 = 1.15;

/// Zoom reached by zoom-in / zoom-out motions
const MAX_ZOOM: f64 = 1.2;

/// Camera motion over a still
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    PanUp,
    PanDown,
}

impl MotionType {
    pub const ALL: [MotionType; 6] = [
        MotionType::ZoomIn,
        MotionType::ZoomOut,
        MotionType::PanLeft,
        MotionType::PanRight,
        MotionType::PanUp,
        MotionType::PanDown,
    ];
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotionType::ZoomIn => "zoom in",
            MotionType::ZoomOut => "zoom out",
            MotionType::PanLeft => "pan left",
            MotionType::PanRight => "pan right",
            MotionType::PanUp => "pan up",
            MotionType::PanDown => "pan down",
        };
        write!(f, "{}", name)
    }
}

/// Start and end state of a motion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub start_zoom: f64,
    pub end_zoom: f64,
    pub start_x: f64,
    pub end_x: f64,
    pub start_y: f64,
    pub end_y: f64,
}

/// Parameters for a motion type
pub fn configure_motion(motion: MotionType) -> MotionParams {
    let centred = MotionParams {
        start_zoom: PAN_ZOOM,
        end_zoom: PAN_ZOOM,
        start_x: 0.5,
        end_x: 0.5,
        start_y: 0.5,
        end_y: 0.5,
    };

    match motion {
        MotionType::ZoomIn => MotionParams {
            start_zoom: 1.0,
            end_zoom: MAX_ZOOM,
            ..centred
        },
        MotionType::ZoomOut => MotionParams {
            start_zoom: MAX_ZOOM,
            end_zoom: 1.0,
            ..centred
        },
        MotionType::PanLeft => MotionParams {
            start_x: 1.0,
            end_x: 0.0,
            ..centred
        },
        MotionType::PanRight => MotionParams {
            start_x: 0.0,
            end_x: 1.0,
            ..centred
        },
        MotionType::PanUp => MotionParams {
            start_y: 1.0,
            end_y: 0.0,
            ..centred
        },
        MotionType::PanDown => MotionParams {
            start_y: 0.0,
            end_y: 1.0,
            ..centred
        },
    }
}

/// Pick a motion uniformly from the given source of randomness
pub fn random_motion<R: Rng + ?Sized>(rng: &mut R) -> MotionType {
    MotionType::ALL[rng.random_range(0..MotionType::ALL.len())]
}

/// `zoompan` filter chain rendering `params` over `duration` seconds
pub fn zoompan_filter(params: &MotionParams, duration: f64, fps: u32, width: u32, height: u32) -> String {
    let frames = ((duration * fps as f64).ceil() as u64).max(1);
    let progress = format!("on/{}", frames);
    let lerp = |from: f64, to: f64| format!("({:.4}+{:.4}*{})", from, to - from, progress);

    // Upscale first so the crop never samples below output resolution
    format!(
        "scale={sw}:{sh}:force_original_aspect_ratio=increase,crop={sw}:{sh},zoompan=z='{z}':x='(iw-iw/zoom)*{x}':y='(ih-ih/zoom)*{y}':d={frames}:s={width}x{height}:fps={fps},setsar=1,format=yuv420p",
        sw = width * 2,
        sh = height * 2,
        z = lerp(params.start_zoom, params.end_zoom),
        x = lerp(params.start_x, params.end_x),
        y = lerp(params.start_y, params.end_y),
    )
}
