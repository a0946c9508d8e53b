//! Baking: sample clip sources over time, compose hierarchical bone
//! matrices, derive root-motion deltas, and lay the clips out in the shared
//! texture.
//!
//! Baking is sequential per clip and strictly frame-ordered (frame 0 before
//! frame 1) because root-motion deltas are differential. A failed bake
//! returns no partial dataset; callers simply re-run it.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{AnimationData, Clip, Frame};
use crate::sampler::{BoneTransform, ClipSource};
use crate::skeleton::{Skeleton, SkeletonError};
use crate::texel::minimal_pow2_size;

/// Clamp range for per-clip frame-rate overrides.
pub const FRAME_RATE_MIN: u32 = 1;
pub const FRAME_RATE_MAX: u32 = 120;

/// Forward axis the baker expresses root-motion directions against; playback
/// rotates the instance's own forward vector by the baked direction.
pub const FORWARD: Vec3 = Vec3::Z;

/// Below this displacement a frame's direction is degenerate and kept at
/// identity.
const MIN_DELTA_DISTANCE: f32 = 1e-6;

#[derive(Debug, Error)]
pub enum BakeError {
    #[error(transparent)]
    Skeleton(#[from] SkeletonError),
    #[error("no clips to bake")]
    NoClips,
    #[error("clip '{0}' has zero frames")]
    EmptyClip(String),
    #[error("clip '{0}' has a non-positive frame rate")]
    InvalidFrameRate(String),
    #[error("duplicate clip name '{0}'")]
    DuplicateClip(String),
}

/// Bake-wide settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BakeSettings {
    /// Per-clip sampling-rate overrides, clamped to [1, 120].
    #[serde(default)]
    pub frame_rate_overrides: HashMap<String, u32>,
}

impl BakeSettings {
    /// Effective sampling rate for a clip: the clamped override if present,
    /// else the source's default.
    pub fn effective_frame_rate(&self, source: &dyn ClipSource) -> u32 {
        match self.frame_rate_overrides.get(source.name()) {
            Some(&rate) => rate.clamp(FRAME_RATE_MIN, FRAME_RATE_MAX),
            None => source.default_frame_rate(),
        }
    }
}

/// Bake every source into one immutable dataset.
///
/// `root_transform` is the root bone's local TRS at bake time; it becomes
/// the dataset's root-motion reference matrix. Validation failures abort the
/// whole bake before any texel layout is produced.
pub fn bake(
    skeleton: Skeleton,
    root_transform: BoneTransform,
    sources: &mut [Box<dyn ClipSource + '_>],
    settings: &BakeSettings,
) -> Result<AnimationData, BakeError> {
    if sources.is_empty() {
        return Err(BakeError::NoClips);
    }

    let mut clips: Vec<Clip> = Vec::with_capacity(sources.len());
    for source in sources.iter_mut() {
        if clips.iter().any(|c| c.name == source.name()) {
            return Err(BakeError::DuplicateClip(source.name().to_string()));
        }
        let frame_rate = settings.effective_frame_rate(source.as_mut());
        let clip = bake_clip(&skeleton, source.as_mut(), frame_rate)?;
        clips.push(clip);
    }

    // Assign each clip's first-texel offset in bake order, then size the
    // texture to the running total.
    let bone_count = skeleton.bone_count();
    let mut total_texels = 0usize;
    for clip in &mut clips {
        clip.pixel_segmentation = total_texels as u32;
        total_texels += clip.texel_count(bone_count);
    }
    let (texture_width, texture_height) = minimal_pow2_size(total_texels);

    log::debug!(
        "baked {} clip(s), {} bone(s), {} texel(s) -> {}x{}",
        clips.len(),
        bone_count,
        total_texels,
        texture_width,
        texture_height
    );

    Ok(AnimationData {
        skeleton,
        clips,
        texture_width,
        texture_height,
        root_transform: root_transform.matrix(),
    })
}

/// Sample one clip into frames. `pixel_segmentation` is left at zero; the
/// caller assigns layout once every clip exists.
fn bake_clip(
    skeleton: &Skeleton,
    source: &mut dyn ClipSource,
    frame_rate: u32,
) -> Result<Clip, BakeError> {
    if frame_rate == 0 {
        return Err(BakeError::InvalidFrameRate(source.name().to_string()));
    }
    let length = source.length();
    let frame_count = (length * frame_rate as f32) as usize;
    if frame_count == 0 {
        return Err(BakeError::EmptyClip(source.name().to_string()));
    }

    let bone_count = skeleton.bone_count();
    let root = skeleton.root_index();

    let mut frames: Vec<Frame> = Vec::with_capacity(frame_count);
    let mut incomplete = false;
    // Positional deltas are measured against the frame-0 baseline: playback
    // replaces its running offset with each frame's delta, so the stored
    // value must be the displacement since the motion segment began.
    // Rotation deltas are frame-to-frame: playback composes them.
    let mut baseline_pos = Vec3::ZERO;
    let mut prev_root_rot = Quat::IDENTITY;

    for f in 0..frame_count {
        // Normalized spacing across the clip; f / frame_rate would drift at
        // the clip end when length * rate is not integral.
        let time = length * f as f32 / frame_count as f32;
        let pose = source.sample_at(time);

        if pose.len() != bone_count {
            log::warn!(
                "clip '{}' frame {f}: sampler returned {} transform(s), expected {bone_count}; \
                 frame marked degenerate",
                source.name(),
                pose.len()
            );
            incomplete = true;
            frames.push(Frame::new(vec![Mat4::IDENTITY; bone_count], root));
            continue;
        }

        let mut frame = Frame::new(compose_matrices(skeleton, &pose), root);

        let root_pos = pose[root].translation;
        let root_rot = pose[root].rotation;
        if f == 0 {
            // The very first sample has no predecessor; its deltas are
            // back-filled from frame 1 below.
            baseline_pos = root_pos;
            prev_root_rot = root_rot;
        } else {
            let delta_pos = root_pos - baseline_pos;
            let distance = delta_pos.length();
            frame.root_motion_delta_distance = distance;
            frame.root_motion_delta_direction = if distance > MIN_DELTA_DISTANCE {
                Quat::from_rotation_arc(FORWARD, delta_pos / distance)
            } else {
                Quat::IDENTITY
            };
            frame.root_motion_delta_rotation = prev_root_rot.inverse() * root_rot;
            prev_root_rot = root_rot;
        }

        frames.push(frame);

        if f == 1 {
            let (direction, distance, rotation) = {
                let second = &frames[1];
                (
                    second.root_motion_delta_direction,
                    second.root_motion_delta_distance,
                    second.root_motion_delta_rotation,
                )
            };
            let first = &mut frames[0];
            first.root_motion_delta_direction = direction;
            first.root_motion_delta_distance = distance;
            first.root_motion_delta_rotation = rotation;
        }
    }

    Ok(Clip {
        name: source.name().to_string(),
        length,
        frame_rate,
        wrap_mode: source.wrap_mode(),
        frames,
        pixel_segmentation: 0,
        root_motion_enabled: source.root_motion_enabled(),
        incomplete,
    })
}

/// For every bone, premultiply its bindpose by the local TRS of each
/// ancestor walking from the bone to the root. The result carries a
/// mesh-space vertex directly into the bone's animated space, so the shader
/// never re-derives the parent chain per vertex.
fn compose_matrices(skeleton: &Skeleton, pose: &[BoneTransform]) -> Vec<Mat4> {
    let mut matrices = Vec::with_capacity(skeleton.bone_count());
    for (i, bone) in skeleton.bones().iter().enumerate() {
        let mut m = bone.bindpose;
        let mut cur = i;
        loop {
            m = pose[cur].matrix() * m;
            match skeleton.bone(cur).parent {
                Some(p) => cur = p,
                None => break,
            }
        }
        matrices.push(m);
    }
    matrices
}
