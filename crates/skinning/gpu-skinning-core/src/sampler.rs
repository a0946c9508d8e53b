//! Pose-sampling contract between the baker and its host collaborator.
//!
//! The baker never touches a live scene graph; it asks a [`ClipSource`] for a
//! settled pose at an explicit time. A call to [`ClipSource::sample_at`] is
//! the one synchronization point per frame: the implementor must have fully
//! settled the pose for that instant before returning.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::data::WrapMode;

/// A bone's local translation/rotation/scale at one time sample.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Local TRS matrix.
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One animation clip as seen by the baker: metadata plus a pose sampler.
///
/// `sample_at` returns one local transform per skeleton bone, in bone-arena
/// order. Calls are strictly ordered within a clip (frame 0 before frame 1)
/// because root-motion deltas are differential. An empty or wrong-length
/// result marks the frame degenerate; it never aborts the clip.
pub trait ClipSource {
    fn name(&self) -> &str;

    /// Clip length in seconds.
    fn length(&self) -> f32;

    /// Sampling rate used when no override is configured.
    fn default_frame_rate(&self) -> u32;

    fn wrap_mode(&self) -> WrapMode;

    fn root_motion_enabled(&self) -> bool;

    /// Settle and read the pose at `time` seconds.
    fn sample_at(&mut self, time: f32) -> Vec<BoneTransform>;
}
