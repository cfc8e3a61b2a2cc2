//! Audio-dynamics features consumed by the prosody markup generator (C9).
//!
//! The detectors that produce these values (SNR, clipping, echo, silence,
//! emotion classification) are out of scope — pure DSP/ML ported verbatim
//! from whatever upstream analyzer is wired in. This is just the shape of
//! their output.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Angry,
    Sad,
    Excited,
    Fearful,
    Surprised,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeLevel {
    Whisper,
    Soft,
    Normal,
    Loud,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmotionDynamics {
    pub emotion: Emotion,
    /// In `[0, 1]`.
    pub intensity: f32,
    pub rate_wpm: u32,
    pub volume_level: VolumeLevel,
}

impl Default for EmotionDynamics {
    fn default() -> Self {
        Self {
            emotion: Emotion::Neutral,
            intensity: 0.0,
            rate_wpm: 150,
            volume_level: VolumeLevel::Normal,
        }
    }
}
