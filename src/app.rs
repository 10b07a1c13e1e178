//! 前端：可交互的 minifb 窗口和无窗口的快照渲染

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Context;
use log::info;
use minifb::{Key, MouseButton, MouseMode, Window, WindowOptions};

use crate::avatar::AvatarState;
use crate::fetch::Location;
use crate::loader::ConfigLoader;
use crate::scene::SceneHost;

const SNAPSHOT_STEP: f32 = 1.0 / 60.0;

/// 应用级状态，交给响应用户操作的一方
#[derive(Debug, Default)]
pub struct AppState {
    activations: u32,
}

impl AppState {
    pub fn record_activation(&mut self) {
        self.activations += 1;
        info!("avatar activated ({} so far)", self.activations);
    }

    pub fn activations(&self) -> u32 {
        self.activations
    }
}

#[derive(Debug, Clone)]
pub struct StageOptions {
    pub config: Location,
    pub asset: Location,
    pub width: usize,
    pub height: usize,
}

fn scene_for(options: &StageOptions, ssaa: usize, state: &Rc<RefCell<AppState>>) -> SceneHost {
    let state = Rc::clone(state);
    SceneHost::new(
        ConfigLoader::spawn(options.config.clone()),
        options.asset.clone(),
        options.width,
        options.height,
        ssaa,
        Box::new(move || state.borrow_mut().record_activation()),
    )
}

/// 等待加载完成，以 60 Hz 推进 `frames` 帧并写出 PNG
pub fn run_snapshot(options: &StageOptions, output: &Path, frames: u32, ssaa: usize) -> anyhow::Result<AvatarState> {
    let state = Rc::new(RefCell::new(AppState::default()));
    let mut scene = scene_for(options, ssaa, &state);
    let avatar = scene.wait_until_loaded();
    info!("avatar {avatar:?}, advancing {frames} frames");
    for _ in 0..frames.max(1) {
        scene.frame(SNAPSHOT_STEP);
    }
    scene.render();
    scene
        .save_snapshot(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(avatar)
}

/// 两帧之间的指针状态
#[derive(Debug, Default)]
struct Pointer {
    last: Option<(f32, f32)>,
    left: bool,
    right: bool,
}

pub fn run_window(options: &StageOptions) -> anyhow::Result<()> {
    let mut window = Window::new(
        "metabot-stage (Esc to quit)",
        options.width,
        options.height,
        WindowOptions::default(),
    )
    .context("failed to open window")?;
    window.set_target_fps(60);

    let state = Rc::new(RefCell::new(AppState::default()));
    let mut scene = scene_for(options, 1, &state);
    let mut pointer = Pointer::default();
    let mut last_frame = Instant::now();
    let mut shown_activations = 0;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let now = Instant::now();
        let delta = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        let position = window.get_mouse_pos(MouseMode::Discard);
        let left = window.get_mouse_down(MouseButton::Left);
        let right = window.get_mouse_down(MouseButton::Right);
        if let Some((x, y)) = position {
            if left && !pointer.left {
                scene.pointer_down(x as usize, y as usize);
            }
            if let Some((px, py)) = pointer.last {
                let (dx, dy) = (x - px, y - py);
                if left && pointer.left {
                    scene.orbit(dx, dy);
                } else if right && pointer.right {
                    scene.pan(dx, dy);
                }
            }
        }
        if let Some((_, scroll)) = window.get_scroll_wheel() {
            scene.zoom(scroll.signum());
        }
        pointer = Pointer {
            last: position,
            left,
            right,
        };

        scene.frame(delta);
        scene.render();

        let activations = state.borrow().activations();
        if activations != shown_activations {
            shown_activations = activations;
            window.set_title(&format!("metabot-stage - {activations} activations"));
        }

        let frame = scene.frame_buffer();
        window
            .update_with_buffer(&frame.data, frame.width, frame.height)
            .context("failed to present frame")?;
    }
    Ok(())
}
