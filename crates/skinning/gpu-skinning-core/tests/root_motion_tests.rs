use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use gpu_skinning_core::{
    config::Config,
    data::{AnimationData, Clip, Frame, WrapMode},
    engine::Engine,
    ids::PlayerId,
    inputs::{CullingMode, Inputs, PlayerCommand},
    skeleton::{Bone, Skeleton},
    texel::minimal_pow2_size,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn approx_vec3(a: Vec3, b: Vec3, eps: f32) {
    approx(a.x, b.x, eps);
    approx(a.y, b.y, eps);
    approx(a.z, b.z, eps);
}

/// A clip whose root advances `step` along its forward axis every frame.
///
/// Distances are cumulative from the clip start; frame 0 mirrors frame 1,
/// which is how the baker back-fills it.
fn striding_clip(frame_count: usize, frame_rate: u32, wrap_mode: WrapMode, step: f32) -> Clip {
    let frames = (0..frame_count)
        .map(|f| {
            let mut frame = Frame::new(vec![Mat4::IDENTITY], 0);
            frame.root_motion_delta_distance = step * f.max(1) as f32;
            frame
        })
        .collect();
    Clip {
        name: "stride".into(),
        length: frame_count as f32 / frame_rate as f32,
        frame_rate,
        wrap_mode,
        frames,
        pixel_segmentation: 0,
        root_motion_enabled: true,
        incomplete: false,
    }
}

fn mk_data(mut clips: Vec<Clip>) -> Arc<AnimationData> {
    let skeleton = Skeleton::new(vec![Bone::new("root", Mat4::IDENTITY, None)]).unwrap();
    let mut total = 0usize;
    for c in &mut clips {
        c.pixel_segmentation = total as u32;
        total += c.texel_count(1);
    }
    let (w, h) = minimal_pow2_size(total);
    Arc::new(AnimationData {
        skeleton,
        clips,
        texture_width: w,
        texture_height: h,
        root_transform: Mat4::IDENTITY,
    })
}

/// Engine with one root-motion player; the Play command rides the first tick.
fn setup(clip: Clip) -> (Engine, PlayerId, Inputs) {
    let data = mk_data(vec![clip]);
    let mut eng = Engine::new(Config::default());
    let anim = eng.load_animation(data);
    let p = eng.create_player("strider", anim);
    let inputs = Inputs {
        player_cmds: vec![
            PlayerCommand::SetRootMotion {
                player: p,
                enabled: true,
            },
            PlayerCommand::Play {
                player: p,
                clip: "stride".into(),
            },
        ],
    };
    (eng, p, inputs)
}

fn pos(eng: &Engine, p: PlayerId) -> Vec3 {
    eng.player(p).unwrap().position
}

#[test]
fn each_loop_cycle_adds_the_clip_total_displacement() {
    // 10 frames at 0.1 per frame: 0.9 of forward travel per cycle.
    let (mut eng, p, mut inputs) = setup(striding_clip(10, 10, WrapMode::Loop, 0.1));

    let mut z_after_wrap = Vec::new();
    for tick in 0..21 {
        eng.update(0.1, std::mem::take(&mut inputs));
        // Ticks 0, 10 and 20 land on frame 0 of successive cycles.
        if tick % 10 == 0 {
            z_after_wrap.push(pos(&eng, p).z);
        }
    }
    approx(z_after_wrap[1] - z_after_wrap[0], 0.9, 1e-4);
    approx(z_after_wrap[2] - z_after_wrap[1], 0.9, 1e-4);
    approx_vec3(
        pos(&eng, p) * Vec3::new(1.0, 1.0, 0.0),
        Vec3::ZERO,
        1e-6,
    );
}

#[test]
fn coarse_ticks_cover_the_same_ground_as_fine_ones() {
    // Same clip stepped at one frame per tick and at three frames per tick;
    // both observers must agree wherever their sample times coincide.
    let clip = striding_clip(10, 10, WrapMode::Loop, 0.1);

    let (mut fine, fp, mut fine_inputs) = setup(clip.clone());
    for _ in 0..28 {
        fine.update(0.1, std::mem::take(&mut fine_inputs));
    }

    let (mut coarse, cp, mut coarse_inputs) = setup(clip);
    for _ in 0..10 {
        coarse.update(0.3, std::mem::take(&mut coarse_inputs));
    }

    // 28 fine ticks and 10 coarse ticks both end on frame 7 of cycle 3.
    approx_vec3(pos(&fine, fp), pos(&coarse, cp), 1e-4);
    approx(pos(&fine, fp).z, 2.5, 1e-4);
}

#[test]
fn once_clip_applies_each_frame_once_and_pins() {
    let (mut eng, p, mut inputs) = setup(striding_clip(5, 10, WrapMode::Once, 0.1));

    for _ in 0..5 {
        eng.update(0.1, std::mem::take(&mut inputs));
    }
    // Total travel equals the final frame's cumulative delta.
    approx(pos(&eng, p).z, 0.4, 1e-5);

    // Pinned at the final frame: no further motion.
    for _ in 0..3 {
        eng.update(0.1, Inputs::default());
    }
    approx(pos(&eng, p).z, 0.4, 1e-5);
}

#[test]
fn rotation_deltas_compose_per_frame() {
    let mut clip = striding_clip(10, 10, WrapMode::Loop, 0.0);
    for frame in &mut clip.frames {
        frame.root_motion_delta_rotation = Quat::from_rotation_y(0.1);
    }
    let (mut eng, p, mut inputs) = setup(clip);

    for _ in 0..10 {
        eng.update(0.1, std::mem::take(&mut inputs));
    }
    let expected = Quat::from_rotation_y(1.0);
    let dot = eng.player(p).unwrap().rotation.dot(expected).abs();
    assert!(dot > 0.9999, "rotation drifted, dot={dot}");
}

#[test]
fn translation_follows_the_instance_heading() {
    let (mut eng, p, inputs) = setup(striding_clip(10, 10, WrapMode::Loop, 0.1));
    // Face +X; the clip's forward travel must land on the world X axis.
    eng.player_mut(p).unwrap().rotation = Quat::from_rotation_y(FRAC_PI_2);

    eng.update(0.1, inputs);
    approx_vec3(pos(&eng, p), Vec3::new(0.1, 0.0, 0.0), 1e-5);
}

#[test]
fn material_carries_the_inverse_root_matrix_while_active() {
    let mut clip = striding_clip(2, 10, WrapMode::Loop, 0.0);
    let offset = Vec3::new(0.0, 0.5, 0.0);
    clip.frames[0] = Frame::new(vec![Mat4::from_translation(offset)], 0);
    let (mut eng, p, inputs) = setup(clip);

    let out = eng.update(0.1, inputs);
    assert_eq!(out.changes.len(), 1);
    assert_eq!(out.changes[0].player, p);
    let expected = Mat4::from_translation(-offset);
    let diff = (out.changes[0].props.root_motion - expected).abs();
    assert!(diff.to_cols_array().iter().all(|&v| v < 1e-5));
}

#[test]
fn root_motion_needs_both_the_clip_and_the_player_flag() {
    // Clip flag off: the instance toggle alone does nothing.
    let mut clip = striding_clip(10, 10, WrapMode::Loop, 0.1);
    clip.root_motion_enabled = false;
    let (mut eng, p, mut inputs) = setup(clip);
    for _ in 0..5 {
        let out = eng.update(0.1, std::mem::take(&mut inputs));
        for c in &out.changes {
            assert_eq!(c.props.root_motion, Mat4::IDENTITY);
        }
    }
    approx_vec3(pos(&eng, p), Vec3::ZERO, 0.0);

    // Player toggle off: the clip flag alone does nothing either.
    let data = mk_data(vec![striding_clip(10, 10, WrapMode::Loop, 0.1)]);
    let mut eng = Engine::new(Config::default());
    let anim = eng.load_animation(data);
    let p = eng.create_player("strider", anim);
    let mut inputs = Inputs {
        player_cmds: vec![PlayerCommand::Play {
            player: p,
            clip: "stride".into(),
        }],
    };
    for _ in 0..5 {
        eng.update(0.1, std::mem::take(&mut inputs));
    }
    approx_vec3(pos(&eng, p), Vec3::ZERO, 0.0);
}

#[test]
fn cull_update_transforms_moves_invisible_players() {
    let (mut eng, p, mut inputs) = setup(striding_clip(10, 10, WrapMode::Loop, 0.1));
    inputs.player_cmds.push(PlayerCommand::SetVisible {
        player: p,
        visible: false,
    });

    // Default culling keeps root motion current while hiding material.
    for _ in 0..5 {
        let out = eng.update(0.1, std::mem::take(&mut inputs));
        assert!(out.changes.is_empty());
    }
    approx(pos(&eng, p).z, 0.4, 1e-5);

    // CullCompletely freezes the pose entirely.
    let out = eng.update(
        0.1,
        Inputs {
            player_cmds: vec![PlayerCommand::SetCullingMode {
                player: p,
                mode: CullingMode::CullCompletely,
            }],
        },
    );
    assert!(out.changes.is_empty());
    let frozen = pos(&eng, p).z;
    for _ in 0..2 {
        eng.update(0.1, Inputs::default());
    }
    approx(pos(&eng, p).z, frozen, 0.0);

    // On reappearing, the frame budget catches the pose up.
    eng.update(
        0.1,
        Inputs {
            player_cmds: vec![
                PlayerCommand::SetCullingMode {
                    player: p,
                    mode: CullingMode::CullUpdateTransforms,
                },
                PlayerCommand::SetVisible {
                    player: p,
                    visible: true,
                },
            ],
        },
    );
    approx(pos(&eng, p).z, 0.8, 1e-5);
}
