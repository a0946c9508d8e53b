#![allow(dead_code)]
//! GPU-Skinning Core (renderer-agnostic)
//!
//! Converts skeletal animation clips into a texture-encoded, instancing
//! friendly format and drives runtime playback (looping, cross-fade
//! blending, root-motion reconstruction) for many independent instances
//! sharing one baked dataset. The crate produces data and per-tick material
//! values; rendering itself belongs to the host.

pub mod baking;
pub mod config;
pub mod data;
pub mod engine;
pub mod ids;
pub mod inputs;
pub mod outputs;
pub mod sampler;
pub mod skeleton;
pub mod texel;

// Re-exports for consumers (adapters)
pub use baking::{bake, BakeError, BakeSettings};
pub use config::{Config, ShaderPropertyNames};
pub use data::{AnimationData, Clip, Frame, WrapMode};
pub use engine::{Engine, Player};
pub use ids::{AnimId, PlayerId};
pub use inputs::{CullingMode, Inputs, PlayerCommand};
pub use outputs::{Change, CoreEvent, CrossFadeProps, DatasetProps, MaterialProps, Outputs};
pub use sampler::{BoneTransform, ClipSource};
pub use skeleton::{Bone, Skeleton, SkeletonError};
pub use texel::{encode_animation, minimal_pow2_size, pack_pair, unpack_pair, Texture};
