//! Progression and repetition-compression configuration
//!
//! Plain value types, replaced wholesale through the command queue. They
//! carry serde derives so the embedding application can persist them with
//! its own settings; the engine itself never touches disk for config.

use serde::{Deserialize, Serialize};

/// When to begin blending to the next riff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerPoint {
    /// Start blending whenever a new riff arrives
    Arbitrary,
    /// When the current riff loops around to its start (once per loop)
    NextRiffStart,
    /// When any bar boundary is crossed
    #[default]
    AnyBarStart,
    /// When an even-numbered bar boundary is crossed
    AnyEvenBarStart,
}

impl TriggerPoint {
    /// Display name for UI
    pub fn label(&self) -> &'static str {
        match self {
            TriggerPoint::Arbitrary => "At Any Point",
            TriggerPoint::NextRiffStart => "At Riff Start",
            TriggerPoint::AnyBarStart => "At Any Bar Start",
            TriggerPoint::AnyEvenBarStart => "At Even Bar Start",
        }
    }
}

/// How long the blend to the next riff should take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendTime {
    /// Hard cut, no crossfade
    Zero,
    OneBar,
    #[default]
    TwoBars,
    FourBars,
    EightBars,
}

impl BlendTime {
    /// Display name for UI
    pub fn label(&self) -> &'static str {
        match self {
            BlendTime::Zero => "Instant",
            BlendTime::OneBar => "One Bar",
            BlendTime::TwoBars => "Two Bars",
            BlendTime::FourBars => "Four Bars",
            BlendTime::EightBars => "Eight Bars",
        }
    }

    /// Multiplier applied to one riff-bar duration to derive the blend length
    ///
    /// `Zero` never reaches this path (hard cuts skip rate derivation); it
    /// falls through to one bar.
    pub fn bar_multiplier(&self) -> f64 {
        match self {
            BlendTime::Zero | BlendTime::OneBar => 1.0,
            BlendTime::TwoBars => 2.0,
            BlendTime::FourBars => 4.0,
            BlendTime::EightBars => 8.0,
        }
    }
}

/// Riff progression configuration, replaceable wholesale at block boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// When to begin blending to the next riff
    pub trigger_point: TriggerPoint,
    /// How long the blend takes
    pub blend_time: BlendTime,
    /// If set, collapse the pending queue to the most recent riff when a
    /// transition begins; otherwise work through each enqueued riff in turn
    pub greedy_mode: bool,
}

/// Repetition-compression ("repcom") configuration
///
/// Must not be replaced while multitrack recording is active; the control
/// surface rejects it (see [`EngineError::RecordingInProgress`]).
///
/// [`EngineError::RecordingInProgress`]: super::EngineError::RecordingInProgress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepComConfig {
    /// When multitrack recording is active, pause capture once a bar has
    /// repeated for longer than the riff's longest stem
    pub enable: bool,
}
