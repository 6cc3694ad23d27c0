//! Audio and video inputs.
//!
//! Decoding and transcription happen in external tools; these types only carry
//! the file identity and whatever transcript segments a component attaches.

use super::FileState;
use serde::{Deserialize, Serialize};

/// A stretch of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Audio {
    #[serde(flatten)]
    pub state: FileState,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(flatten)]
    pub state: FileState,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    /// Timestamps of detected scene changes.
    #[serde(default)]
    pub scene_cuts_secs: Vec<f64>,
}
