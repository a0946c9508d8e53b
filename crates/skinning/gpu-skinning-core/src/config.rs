//! Core configuration for gpu-skinning-core.

use serde::{Deserialize, Serialize};

/// Material property names the host renderer uploads per dataset/instance.
///
/// Resolved once at startup and carried by the [`crate::outputs::DatasetProps`]
/// handed to the renderer, rather than living in process-wide mutable state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShaderPropertyNames {
    /// Per-dataset vec: (textureWidth, textureHeight, texelsPerFrame).
    pub texture_size_texels_per_frame: String,
    /// Per-instance vec: (frameIndex, pixelSegmentation).
    pub frame_index_segmentation: String,
    /// Per-instance vec: (prevFrameIndex, prevPixelSegmentation, blendFactor).
    pub frame_index_segmentation_cross_fade: String,
    /// Per-instance matrix: root-motion offset.
    pub root_motion: String,
}

impl Default for ShaderPropertyNames {
    fn default() -> Self {
        Self {
            texture_size_texels_per_frame: "_GPUSkin_TextureSize_NumPixelsPerFrame".into(),
            frame_index_segmentation: "_GPUSkin_FrameIndex_PixelSegmentation".into(),
            frame_index_segmentation_cross_fade:
                "_GPUSkin_FrameIndex_PixelSegmentation_Blend_CrossFade".into(),
            root_motion: "_GPUSkin_RootMotion".into(),
        }
    }
}

/// Configuration for engine sizing and renderer naming.
/// Keep this minimal; expand as needed without breaking API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub shader: ShaderPropertyNames,

    /// Maximum events to retain per tick; later events are dropped.
    pub max_events_per_tick: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shader: ShaderPropertyNames::default(),
            max_events_per_tick: 1024,
        }
    }
}
