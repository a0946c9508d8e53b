//! Baked animation data model.
//!
//! Everything here is produced wholesale by the baker and immutable
//! afterwards; a dataset is shared by reference (`Arc`) across all playback
//! instances, so nothing on these types mutates after the bake.

use glam::{Mat4, Quat};
use serde::{Deserialize, Serialize};

use crate::outputs::DatasetProps;
use crate::skeleton::Skeleton;
use crate::texel::TEXELS_PER_MATRIX;

/// Playback behavior once a clip's end is reached.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WrapMode {
    /// Clamp at the final frame.
    Once,
    /// Wrap around to the first frame.
    Loop,
}

/// One baked time sample: per-bone skinning matrices plus root-motion deltas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Frame {
    /// One matrix per bone, carrying a mesh-space vertex into that bone's
    /// animated space at this sample.
    pub matrices: Vec<Mat4>,
    /// Direction of the root displacement since the previous frame, as the
    /// rotation carrying the forward axis onto it.
    pub root_motion_delta_direction: Quat,
    /// Magnitude of the root displacement since the previous frame.
    pub root_motion_delta_distance: f32,
    /// Root orientation delta from the previous frame.
    pub root_motion_delta_rotation: Quat,
    /// Inverse of the root bone's matrix for this frame. Computed once at
    /// bake time; lazily memoizing it would race under concurrent readers.
    pub root_motion_inv: Mat4,
}

impl Frame {
    /// Build a frame, deriving `root_motion_inv` from the root bone's matrix.
    pub fn new(matrices: Vec<Mat4>, root_bone_index: usize) -> Self {
        let root_motion_inv = matrices
            .get(root_bone_index)
            .map(|m| m.inverse())
            .unwrap_or(Mat4::IDENTITY);
        Self {
            matrices,
            root_motion_delta_direction: Quat::IDENTITY,
            root_motion_delta_distance: 0.0,
            root_motion_delta_rotation: Quat::IDENTITY,
            root_motion_inv,
        }
    }
}

/// One baked clip and its placement within the shared texture.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    /// Length in seconds.
    pub length: f32,
    /// Sampling rate the clip was baked at, > 0.
    pub frame_rate: u32,
    pub wrap_mode: WrapMode,
    pub frames: Vec<Frame>,
    /// Index of this clip's first texel in the shared texture.
    pub pixel_segmentation: u32,
    pub root_motion_enabled: bool,
    /// Set when any frame was degenerate during baking (sampler returned no
    /// usable pose); such frames carry identity matrices and zero deltas.
    pub incomplete: bool,
}

impl Clip {
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn last_frame_index(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Resolve a frame index for an elapsed time on this clip.
    ///
    /// `time == length` resolves to the final frame; the plain modulo would
    /// wrap it to zero exactly at the end boundary of a Once-mode clip.
    pub fn frame_index_at(&self, time: f32) -> usize {
        if self.frames.is_empty() {
            return 0;
        }
        if time == self.length {
            return self.last_frame_index();
        }
        (time * self.frame_rate as f32) as usize % self.frames.len()
    }

    /// Texels this clip occupies in the shared texture.
    #[inline]
    pub fn texel_count(&self, bone_count: usize) -> usize {
        bone_count * TEXELS_PER_MATRIX * self.frames.len()
    }
}

/// Aggregate produced once per bake and shared read-only across instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnimationData {
    pub skeleton: Skeleton,
    /// Clips in bake order; names are unique.
    pub clips: Vec<Clip>,
    /// Power-of-two texture dimensions holding every clip's texels.
    pub texture_width: u32,
    pub texture_height: u32,
    /// The root bone's local TRS at bake time.
    pub root_transform: Mat4,
}

impl AnimationData {
    /// Look up a clip by name.
    pub fn clip(&self, name: &str) -> Option<(usize, &Clip)> {
        self.clips
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
    }

    /// Texels consumed by one frame of any clip.
    #[inline]
    pub fn texels_per_frame(&self) -> usize {
        self.skeleton.bone_count() * TEXELS_PER_MATRIX
    }

    /// Total texels across all clips.
    pub fn total_texel_count(&self) -> usize {
        let bones = self.skeleton.bone_count();
        self.clips.iter().map(|c| c.texel_count(bones)).sum()
    }

    /// Static per-dataset triple the renderer uploads once.
    pub fn dataset_props(&self) -> DatasetProps {
        DatasetProps {
            texture_width: self.texture_width,
            texture_height: self.texture_height,
            texels_per_frame: self.texels_per_frame() as u32,
        }
    }

    /// Stored JSON form, for hosts that persist baked datasets.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Bone;

    fn clip(length: f32, frame_rate: u32, wrap_mode: WrapMode) -> Clip {
        let frame_count = (length * frame_rate as f32) as usize;
        Clip {
            name: "c".into(),
            length,
            frame_rate,
            wrap_mode,
            frames: (0..frame_count)
                .map(|_| Frame::new(vec![Mat4::IDENTITY], 0))
                .collect(),
            pixel_segmentation: 0,
            root_motion_enabled: false,
            incomplete: false,
        }
    }

    #[test]
    fn frame_index_basics() {
        let c = clip(1.0, 30, WrapMode::Loop);
        assert_eq!(c.frame_count(), 30);
        assert_eq!(c.frame_index_at(0.0), 0);
        assert_eq!(c.frame_index_at(0.5), 15);
        // Exactly at the end: final frame, not modulo zero.
        assert_eq!(c.frame_index_at(1.0), 29);
        // Past the end (loop time keeps growing): wraps around.
        assert_eq!(c.frame_index_at(1.5), 15);
    }

    #[test]
    fn frame_index_in_range_over_whole_clip() {
        let c = clip(2.0, 24, WrapMode::Once);
        let n = c.frame_count();
        for i in 0..=200 {
            let t = 2.0 * i as f32 / 200.0;
            let idx = c.frame_index_at(t);
            assert!(idx < n, "t={t} idx={idx}");
        }
    }

    #[test]
    fn stored_form_round_trips() {
        let sk = Skeleton::new(vec![Bone::new("root", Mat4::IDENTITY, None)]).unwrap();
        let data = AnimationData {
            skeleton: sk,
            clips: vec![clip(1.0, 10, WrapMode::Loop)],
            texture_width: 8,
            texture_height: 8,
            root_transform: Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0)),
        };
        let restored = AnimationData::from_json(&data.to_json().unwrap()).unwrap();
        assert_eq!(restored.clips.len(), 1);
        assert_eq!(restored.clips[0].frame_count(), 10);
        assert_eq!(restored.texture_width, 8);
        assert_eq!(restored.root_transform, data.root_transform);
    }

    #[test]
    fn texel_accounting() {
        let sk = Skeleton::new(vec![Bone::new("root", Mat4::IDENTITY, None)]).unwrap();
        let data = AnimationData {
            skeleton: sk,
            clips: vec![clip(1.0, 10, WrapMode::Loop), clip(0.5, 10, WrapMode::Once)],
            texture_width: 16,
            texture_height: 8,
            root_transform: Mat4::IDENTITY,
        };
        assert_eq!(data.texels_per_frame(), 6);
        assert_eq!(data.total_texel_count(), 6 * 10 + 6 * 5);
    }
}
