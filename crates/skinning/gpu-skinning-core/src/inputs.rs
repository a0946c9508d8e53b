//! Input contracts for the playback engine.
//!
//! Hosts build these once per fixed tick and pass them into
//! `Engine::update()`; commands are applied before time advances.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Inputs {
    /// Player-level commands applied before stepping.
    #[serde(default)]
    pub player_cmds: Vec<PlayerCommand>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PlayerCommand {
    /// Switch to a clip with an immediate cut. Unknown names are ignored.
    Play {
        player: PlayerId,
        clip: String,
    },
    /// Switch to a clip, blending from the outgoing one over `fade` seconds.
    CrossFade {
        player: PlayerId,
        clip: String,
        fade: f32,
    },
    /// Pause; elapsed time and clip selection are retained.
    Stop {
        player: PlayerId,
    },
    /// Continue a paused player, if a clip is selected.
    Resume {
        player: PlayerId,
    },
    /// Host-side visibility signal consumed by the culling policy.
    SetVisible {
        player: PlayerId,
        visible: bool,
    },
    SetCullingMode {
        player: PlayerId,
        mode: CullingMode,
    },
    /// Per-instance root-motion toggle, ANDed with the clip's own flag.
    SetRootMotion {
        player: PlayerId,
        enabled: bool,
    },
}

/// What to keep updating while the host reports the instance invisible.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CullingMode {
    /// Update everything regardless of visibility.
    AlwaysAnimate,
    /// Skip animation sampling but keep root motion current, so the
    /// instance reappears in the right place.
    CullUpdateTransforms,
    /// Skip both animation sampling and root motion.
    CullCompletely,
}
