//! Output contracts from the playback engine.
//!
//! Outputs carry only what changed this tick: per-player material values to
//! upload, plus a separate list of semantic events. Hosts pair the values
//! with the property names in `Config::shader`.

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// Static per-dataset triple, uploaded once per material.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetProps {
    pub texture_width: u32,
    pub texture_height: u32,
    /// Texels consumed by one frame: bone count x 6.
    pub texels_per_frame: u32,
}

/// Previous-clip contribution while a cross-fade is in flight.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CrossFadeProps {
    pub frame_index: u32,
    pub pixel_segmentation: u32,
    /// Blend weight in [0, 1]: 0 at transition start, 1 at fade end.
    pub blend_factor: f32,
}

/// Per-instance values for this tick's sampled frame.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MaterialProps {
    pub frame_index: u32,
    pub pixel_segmentation: u32,
    /// `None` means no blend; the renderer treats it as blend factor 1.
    pub cross_fade: Option<CrossFadeProps>,
    /// Root-motion offset matrix; identity when root motion is off.
    pub root_motion: Mat4,
}

/// One changed player this tick.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Change {
    pub player: PlayerId,
    pub props: MaterialProps,
}

/// Discrete semantic signals emitted during stepping.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CoreEvent {
    PlaybackStarted { player: PlayerId, clip: String },
    PlaybackStopped { player: PlayerId },
    PlaybackResumed { player: PlayerId },
    /// A Once-mode clip reached its final frame and pinned there.
    ClipEnded { player: PlayerId, clip: String },
}

/// Outputs returned by `Engine::update()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub events: Vec<CoreEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.changes.clear();
        self.events.clear();
    }

    #[inline]
    pub fn push_change(&mut self, change: Change) {
        self.changes.push(change);
    }

    #[inline]
    pub fn push_event(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.events.is_empty()
    }
}
