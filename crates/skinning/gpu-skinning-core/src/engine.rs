//! Engine: shared dataset ownership and per-player playback stepping.
//!
//! Methods:
//! - new, load_animation, create_player, update (commands → material changes)
//!
//! A dataset is loaded once as `Arc<AnimationData>` and read by every player;
//! each player exclusively owns its mutable playback state, so ticking many
//! players needs no locking.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::baking::FORWARD;
use crate::config::Config;
use crate::data::{AnimationData, Clip, Frame, WrapMode};
use crate::ids::{AnimId, IdAllocator, PlayerId};
use crate::inputs::{CullingMode, Inputs, PlayerCommand};
use crate::outputs::{Change, CoreEvent, CrossFadeProps, DatasetProps, MaterialProps, Outputs};

/// Per-instance playback state machine.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub anim: AnimId,

    /// World-space pose driven by root motion; hosts may seed it.
    pub position: Vec3,
    pub rotation: Quat,

    pub visible: bool,
    pub culling: CullingMode,
    /// Instance-level toggle, ANDed with the playing clip's own flag.
    pub root_motion_enabled: bool,

    playing_clip: Option<usize>,
    playing: bool,
    time: f32,

    prev_clip: Option<usize>,
    prev_time: f32,
    cross_fade_duration: f32,
    cross_fade_progress: f32,

    /// (clip, frame) last uploaded; suppresses redundant changes.
    last_emitted: Option<(usize, usize)>,

    /// Last frame whose root-motion delta was applied; -1 before any.
    /// Kept signed because the loop-wrap budget subtracts across the reset.
    root_motion_frame: i32,
    /// Accumulated displacement within the current motion segment.
    root_motion_offset: Vec3,
}

impl Player {
    fn new(id: PlayerId, name: String, anim: AnimId) -> Self {
        Self {
            id,
            name,
            anim,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            visible: true,
            culling: CullingMode::CullUpdateTransforms,
            root_motion_enabled: false,
            playing_clip: None,
            playing: false,
            time: 0.0,
            prev_clip: None,
            prev_time: 0.0,
            cross_fade_duration: 0.0,
            cross_fade_progress: 0.0,
            last_emitted: None,
            root_motion_frame: -1,
            root_motion_offset: Vec3::ZERO,
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Elapsed time on the current clip, in seconds.
    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Index of the currently selected clip, if any.
    #[inline]
    pub fn current_clip(&self) -> Option<usize> {
        self.playing_clip
    }

    /// Whether the current clip has resolved to its final frame.
    pub fn at_final_frame(&self, data: &AnimationData) -> bool {
        match self.playing_clip {
            Some(idx) => {
                let clip = &data.clips[idx];
                clip.frame_index_at(self.time) == clip.last_frame_index()
            }
            None => false,
        }
    }

    /// Single restart predicate shared by `Play` and `CrossFade`: the
    /// requested clip differs from the current one, or the current clip is
    /// Once-mode pinned at its final frame, or playback is paused.
    fn should_restart(&self, clip_idx: usize, data: &AnimationData) -> bool {
        match self.playing_clip {
            None => true,
            Some(cur) => {
                cur != clip_idx
                    || (data.clips[cur].wrap_mode == WrapMode::Once && self.at_final_frame(data))
                    || !self.playing
            }
        }
    }

    /// Record the outgoing clip and switch to a new one.
    fn set_clip(&mut self, clip_idx: usize) {
        self.prev_clip = self.playing_clip;
        self.prev_time = self.time;
        self.playing = true;
        self.playing_clip = Some(clip_idx);
        self.time = 0.0;
        self.root_motion_frame = -1;
        self.root_motion_offset = Vec3::ZERO;
    }

    /// Immediate cut to a named clip. Returns whether a restart happened.
    fn play(&mut self, data: &AnimationData, name: &str) -> bool {
        let Some((idx, _)) = data.clip(name) else {
            return false;
        };
        if !self.should_restart(idx, data) {
            return false;
        }
        self.set_clip(idx);
        self.cross_fade_duration = 0.0;
        true
    }

    /// Timed blend to a named clip. A same-clip restart is always a cut; a
    /// stale fade window must not resurrect on restart.
    fn cross_fade(&mut self, data: &AnimationData, name: &str, fade: f32) -> bool {
        if self.playing_clip.is_none() {
            return self.play(data, name);
        }
        let Some((idx, _)) = data.clip(name) else {
            return false;
        };
        if !self.should_restart(idx, data) {
            return false;
        }
        if self.playing_clip == Some(idx) {
            self.set_clip(idx);
            self.cross_fade_duration = 0.0;
        } else {
            self.cross_fade_progress = 0.0;
            self.cross_fade_duration = fade.max(0.0);
            self.set_clip(idx);
        }
        true
    }

    fn is_cross_fade_blending(&self) -> bool {
        self.prev_clip.is_some()
            && self.cross_fade_duration > 0.0
            && self.cross_fade_progress <= self.cross_fade_duration
    }

    /// Frame of the outgoing clip contributing to the blend, resolved
    /// against that clip's own elapsed time.
    fn cross_fade_frame_index(&self, data: &AnimationData) -> usize {
        let Some(idx) = self.prev_clip else {
            return 0;
        };
        let prev = &data.clips[idx];
        if prev.wrap_mode == WrapMode::Once && self.prev_time >= prev.length {
            prev.last_frame_index()
        } else {
            prev.frame_index_at(self.prev_time)
        }
    }

    /// One tick: publish material state for the resolved frame, then advance
    /// the clocks. Material state is read before time moves, as the output
    /// describes the frame the instance is on during this tick.
    fn advance(&mut self, data: &AnimationData, dt: f32, outputs: &mut Outputs, max_events: usize) {
        let Some(clip_idx) = self.playing_clip else {
            return;
        };
        if !self.playing {
            return;
        }

        self.update_material(data, clip_idx, dt, outputs);

        let clip = &data.clips[clip_idx];
        match clip.wrap_mode {
            WrapMode::Loop => {
                // Grows unbounded; frame-index resolution wraps via modulo.
                self.time += dt;
            }
            WrapMode::Once => {
                let before = self.time;
                self.time = (self.time + dt).clamp(0.0, clip.length);
                if before < clip.length && self.time >= clip.length {
                    push_event(
                        outputs,
                        max_events,
                        CoreEvent::ClipEnded {
                            player: self.id,
                            clip: clip.name.clone(),
                        },
                    );
                }
            }
        }

        self.cross_fade_progress += dt;
        self.prev_time += dt;
    }

    fn update_material(
        &mut self,
        data: &AnimationData,
        clip_idx: usize,
        dt: f32,
        outputs: &mut Outputs,
    ) {
        let clip = &data.clips[clip_idx];
        let frame_index = clip.frame_index_at(self.time);

        // Nothing to upload until the sampled texel block moves.
        if self.last_emitted == Some((clip_idx, frame_index)) {
            return;
        }
        self.last_emitted = Some((clip_idx, frame_index));

        let root_motion_active = clip.root_motion_enabled && self.root_motion_enabled;

        let mut update_animate = true;
        let mut update_root_motion = true;
        if self.culling != CullingMode::AlwaysAnimate && !self.visible {
            update_animate = false;
            if self.culling == CullingMode::CullCompletely {
                update_root_motion = false;
            }
        }

        if update_animate {
            let frame = &clip.frames[frame_index];
            let root_motion = if root_motion_active {
                data.root_transform * frame.root_motion_inv
            } else {
                Mat4::IDENTITY
            };
            let cross_fade = if self.is_cross_fade_blending() {
                self.prev_clip.map(|prev_idx| CrossFadeProps {
                    frame_index: self.cross_fade_frame_index(data) as u32,
                    pixel_segmentation: data.clips[prev_idx].pixel_segmentation,
                    blend_factor: (self.cross_fade_progress / self.cross_fade_duration)
                        .clamp(0.0, 1.0),
                })
            } else {
                None
            };
            outputs.push_change(Change {
                player: self.id,
                props: MaterialProps {
                    frame_index: frame_index as u32,
                    pixel_segmentation: clip.pixel_segmentation,
                    cross_fade,
                    root_motion,
                },
            });
        }

        if root_motion_active && dt > 0.0 && update_root_motion {
            self.apply_root_motion(clip, frame_index, dt);
        }
    }

    /// Reconstruct root-motion displacement from per-frame deltas.
    fn apply_root_motion(&mut self, clip: &Clip, frame_index: usize, dt: f32) {
        let frame = &clip.frames[frame_index];

        match clip.wrap_mode {
            WrapMode::Once => {
                if self.root_motion_frame != frame_index as i32 {
                    self.step_translation(frame);
                    self.root_motion_frame = frame_index as i32;
                }
            }
            WrapMode::Loop => {
                // A single tick may cover several frames (low clip rate vs.
                // high tick rate) and may wrap past the final frame. Frame
                // advance is counted modulo the clip so a wrap behind the
                // last applied index still spends budget.
                let count = clip.frame_count() as i32;
                let last = clip.last_frame_index() as i32;
                let advanced = (frame_index as i32 - self.root_motion_frame).rem_euclid(count);
                let mut budget = ((dt * clip.frame_rate as f32) as i32).max(advanced);
                while budget > 0 {
                    if self.root_motion_frame + budget > last {
                        // Passing the final frame: its delta completes the
                        // cycle, then the segment restarts from zero.
                        self.step_translation(&clip.frames[last as usize]);
                        budget -= last - self.root_motion_frame;
                        self.root_motion_frame = 0;
                        self.root_motion_offset = Vec3::ZERO;
                        if last == 0 {
                            // Single-frame clip: one application is the
                            // whole cycle.
                            budget = 0;
                        }
                    } else {
                        self.step_translation(frame);
                        budget = 0;
                    }
                }
                self.root_motion_frame = frame_index as i32;
            }
        }

        self.rotation *= frame.root_motion_delta_rotation;
    }

    /// Replace the running segment offset with this frame's world-space
    /// delta, translating by the difference.
    fn step_translation(&mut self, frame: &Frame) {
        let forward = self.rotation * FORWARD;
        let delta =
            frame.root_motion_delta_direction * forward * frame.root_motion_delta_distance;
        self.position += delta - self.root_motion_offset;
        self.root_motion_offset = delta;
    }
}

/// Minimal animation library storage; datasets are shared read-only.
#[derive(Default, Debug)]
struct AnimLib {
    items: Vec<(AnimId, Arc<AnimationData>)>,
}

impl AnimLib {
    fn insert(&mut self, id: AnimId, data: Arc<AnimationData>) {
        self.items.push((id, data));
    }
    fn get(&self, id: AnimId) -> Option<&Arc<AnimationData>> {
        self.items
            .iter()
            .find_map(|(a, d)| if *a == id { Some(d) } else { None })
    }
}

/// Engine (core): owns datasets and players, steps them synchronously.
#[derive(Debug)]
pub struct Engine {
    cfg: Config,
    ids: IdAllocator,
    anims: AnimLib,
    players: Vec<Player>,

    // Per-tick outputs
    outputs: Outputs,
}

fn push_event(outputs: &mut Outputs, max_events: usize, event: CoreEvent) {
    if outputs.events.len() < max_events {
        outputs.push_event(event);
    }
}

impl Engine {
    /// Create a new engine with the given config.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            ids: IdAllocator::new(),
            anims: AnimLib::default(),
            players: Vec::new(),
            outputs: Outputs::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Load a baked dataset, returning an AnimId. The same `Arc` may back
    /// unboundedly many players.
    pub fn load_animation(&mut self, data: Arc<AnimationData>) -> AnimId {
        let id = self.ids.alloc_anim();
        self.anims.insert(id, data);
        id
    }

    /// Create a player bound to a loaded dataset.
    pub fn create_player(&mut self, name: &str, anim: AnimId) -> PlayerId {
        let pid = self.ids.alloc_player();
        self.players.push(Player::new(pid, name.to_string(), anim));
        pid
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Mutable access for host-side seeding (spawn position, culling mode).
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// The static triple the renderer uploads once per dataset.
    pub fn dataset_props(&self, anim: AnimId) -> Option<DatasetProps> {
        self.anims.get(anim).map(|d| d.dataset_props())
    }

    /// Apply player commands (clip selection, pause/resume, culling state).
    fn apply_inputs(&mut self, inputs: Inputs) {
        let Self {
            players,
            anims,
            outputs,
            cfg,
            ..
        } = self;
        let max_events = cfg.max_events_per_tick;

        for cmd in inputs.player_cmds {
            match cmd {
                PlayerCommand::Play { player, clip } => {
                    if let Some(p) = players.iter_mut().find(|p| p.id == player) {
                        if let Some(data) = anims.get(p.anim) {
                            if p.play(data, &clip) {
                                push_event(
                                    outputs,
                                    max_events,
                                    CoreEvent::PlaybackStarted { player, clip },
                                );
                            }
                        }
                    }
                }
                PlayerCommand::CrossFade { player, clip, fade } => {
                    if let Some(p) = players.iter_mut().find(|p| p.id == player) {
                        if let Some(data) = anims.get(p.anim) {
                            if p.cross_fade(data, &clip, fade) {
                                push_event(
                                    outputs,
                                    max_events,
                                    CoreEvent::PlaybackStarted { player, clip },
                                );
                            }
                        }
                    }
                }
                PlayerCommand::Stop { player } => {
                    if let Some(p) = players.iter_mut().find(|p| p.id == player) {
                        if p.playing {
                            p.playing = false;
                            push_event(outputs, max_events, CoreEvent::PlaybackStopped { player });
                        }
                    }
                }
                PlayerCommand::Resume { player } => {
                    if let Some(p) = players.iter_mut().find(|p| p.id == player) {
                        if p.playing_clip.is_some() && !p.playing {
                            p.playing = true;
                            push_event(outputs, max_events, CoreEvent::PlaybackResumed { player });
                        }
                    }
                }
                PlayerCommand::SetVisible { player, visible } => {
                    if let Some(p) = players.iter_mut().find(|p| p.id == player) {
                        p.visible = visible;
                    }
                }
                PlayerCommand::SetCullingMode { player, mode } => {
                    if let Some(p) = players.iter_mut().find(|p| p.id == player) {
                        p.culling = mode;
                    }
                }
                PlayerCommand::SetRootMotion { player, enabled } => {
                    if let Some(p) = players.iter_mut().find(|p| p.id == player) {
                        p.root_motion_enabled = enabled;
                    }
                }
            }
        }
    }

    /// Step the simulation by dt with given inputs, producing outputs.
    /// Apply commands, then advance each player and collect changed
    /// material state.
    pub fn update(&mut self, dt: f32, inputs: Inputs) -> &Outputs {
        self.outputs.clear();

        self.apply_inputs(inputs);

        let Self {
            players,
            anims,
            outputs,
            cfg,
            ..
        } = self;
        for p in players.iter_mut() {
            if let Some(data) = anims.get(p.anim) {
                p.advance(data, dt, outputs, cfg.max_events_per_tick);
            }
        }

        &self.outputs
    }
}
