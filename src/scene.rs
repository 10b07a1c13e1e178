//! 场景宿主。
//!
//! 持有渲染表面、相机和轨道控制器。配置加载器就绪之前
//! 不挂载任何内容；就绪后根据解析出的配置构建
//! 模型展示器、灯光组和可选的阴影平面，
//! 并由唯一的逐帧回调推进。

use std::borrow::Cow;
use std::path::Path;

use cgmath::Matrix4 as Mat4;
use log::{debug, info};

use crate::avatar::{AvatarPresenter, AvatarState, FrameTime};
use crate::camera::{Camera, OrbitControls};
use crate::config::{ModelConfig, vec3_to_f32};
use crate::fetch::Location;
use crate::framebuffer::FrameBuffer;
use crate::lighting::{self, LightRig, ShadowPlane};
use crate::loader::ConfigLoader;
use crate::model::{AvatarModel, Mesh};
use crate::renderer::fragment_shader::{EnvironmentLight, StandardShader};
use crate::renderer::post_effect::ToneMapper;
use crate::renderer::{DrawCall, Renderer};

/// 模型像素在帧缓冲中的标记
pub const AVATAR_TAG: u32 = 1;

struct Stage {
    config: ModelConfig,
    camera: Camera,
    controls: OrbitControls,
    presenter: AvatarPresenter,
    rig: LightRig,
    shadow_plane: Option<ShadowPlane>,
    environment: Option<EnvironmentLight>,
}

pub struct SceneHost {
    loader: ConfigLoader,
    asset: Location,
    renderer: Renderer,
    width: usize,
    height: usize,
    ssaa: usize,
    elapsed: f32,
    on_interact: Option<Box<dyn FnMut()>>,
    stage: Option<Stage>,
}

impl SceneHost {
    /// `width`/`height` 为输出像素，实际以 `ssaa` 倍分辨率渲染
    pub fn new(
        loader: ConfigLoader,
        asset: Location,
        width: usize,
        height: usize,
        ssaa: usize,
        on_interact: Box<dyn FnMut()>,
    ) -> Self {
        let ssaa = ssaa.max(1);
        let mut renderer = Renderer::new(width * ssaa, height * ssaa);
        renderer.clear();
        Self {
            loader,
            asset,
            renderer,
            width,
            height,
            ssaa,
            elapsed: 0.0,
            on_interact: Some(on_interact),
            stage: None,
        }
    }

    /// 轮询进行中的加载，配置就绪后挂载舞台
    pub fn poll(&mut self) -> bool {
        if self.loader.poll() && self.stage.is_none() {
            self.mount();
        }
        if let Some(stage) = &mut self.stage {
            stage.presenter.poll();
        }
        self.stage.is_some()
    }

    /// 阻塞直到配置和模型资源都加载结束
    pub fn wait_until_loaded(&mut self) -> AvatarState {
        self.loader.wait();
        if self.stage.is_none() {
            self.mount();
        }
        match &mut self.stage {
            Some(stage) => stage.presenter.wait(),
            None => AvatarState::Loading,
        }
    }

    fn mount(&mut self) {
        let config = self.loader.config().clone();
        let aspect = self.width as f32 / self.height.max(1) as f32;
        let controls = OrbitControls::from_settings(&config.camera);
        let mut camera = Camera::from_settings(&config.camera, aspect);
        controls.apply(&mut camera);

        let on_interact = self.on_interact.take().unwrap_or_else(|| Box::new(|| {}));
        let presenter = AvatarPresenter::spawn(
            self.asset.clone(),
            &config.model,
            &config.animations,
            config.material.as_ref(),
            on_interact,
        );

        let mut rig = LightRig::new(&config.lighting, vec3_to_f32(config.model.position));
        rig.track_camera(camera.eye);
        let environment = config
            .rendering
            .as_ref()
            .filter(|r| r.environment.enabled)
            .map(|r| {
                let (sky, ground) = r.environment.preset.tints();
                EnvironmentLight {
                    sky: sky.linear(),
                    ground: ground.linear(),
                }
            });
        let shadow_plane = lighting::shadow_plane(&config.shadows);
        self.renderer.tone = ToneMapper::from_settings(config.rendering.as_ref());

        info!(
            "stage mounted: {} lights, shadow plane {}",
            rig.descriptors().len(),
            if shadow_plane.is_some() { "on" } else { "off" }
        );
        self.stage = Some(Stage {
            shadow_plane,
            config,
            camera,
            controls,
            presenter,
            rig,
            environment,
        });
    }

    pub fn is_ready(&self) -> bool {
        self.stage.is_some()
    }

    pub fn config(&self) -> Option<&ModelConfig> {
        self.stage.as_ref().map(|s| &s.config)
    }

    pub fn avatar_state(&self) -> AvatarState {
        self.stage
            .as_ref()
            .map_or(AvatarState::Loading, |s| s.presenter.state())
    }

    pub fn presenter(&self) -> Option<&AvatarPresenter> {
        self.stage.as_ref().map(|s| &s.presenter)
    }

    pub fn rig(&self) -> Option<&LightRig> {
        self.stage.as_ref().map(|s| &s.rig)
    }

    pub fn shadow_plane(&self) -> Option<&ShadowPlane> {
        self.stage.as_ref().and_then(|s| s.shadow_plane.as_ref())
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.stage.as_ref().map(|s| &s.camera)
    }

    /// 逐帧回调：加载、相机、跟随光、模型运动
    pub fn frame(&mut self, delta: f32) {
        self.elapsed += delta;
        self.poll();
        let Some(stage) = &mut self.stage else {
            return;
        };
        stage.controls.apply(&mut stage.camera);
        stage.rig.track_camera(stage.camera.eye);
        stage.presenter.update(FrameTime {
            elapsed: self.elapsed,
            delta,
        });
    }

    pub fn render(&mut self) {
        self.renderer.clear();
        let Some(stage) = &self.stage else {
            return;
        };
        let Some((model, world)) = stage.presenter.world_matrices() else {
            return;
        };

        let shader = StandardShader {
            lights: stage.rig.shade_lights(),
            environment: stage.environment,
        };
        for_each_mesh(model, &world, |mesh, matrix| {
            self.renderer.draw(
                &stage.camera,
                &shader,
                &DrawCall {
                    triangles: &mesh.triangles,
                    model: *matrix,
                    material: model.material(mesh.material),
                    tag: AVATAR_TAG,
                },
            );
        });

        if let Some(plane) = &stage.shadow_plane {
            for direction in stage.rig.shadow_directions() {
                for_each_mesh(model, &world, |mesh, matrix| {
                    self.renderer
                        .draw_shadow(&stage.camera, &mesh.triangles, matrix, plane, direction);
                });
            }
            self.renderer.resolve_shadows(plane.opacity);
        }
    }

    /// 最近一次渲染的帧（输出分辨率）
    pub fn frame_buffer(&self) -> Cow<'_, FrameBuffer> {
        if self.ssaa > 1 {
            Cow::Owned(self.renderer.framebuffer().ssaa(self.ssaa))
        } else {
            Cow::Borrowed(self.renderer.framebuffer())
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), image::ImageError> {
        self.frame_buffer().save_to_image(path)
    }

    /// 在输出像素 `(x, y)` 处按下指针；若模型覆盖该像素则激活模型
    pub fn pointer_down(&mut self, x: usize, y: usize) -> bool {
        let (sx, sy) = (x * self.ssaa + self.ssaa / 2, y * self.ssaa + self.ssaa / 2);
        let hit = self.renderer.framebuffer().tag_at(sx, sy) == AVATAR_TAG;
        let Some(stage) = &mut self.stage else {
            return false;
        };
        if !hit || stage.presenter.state() == AvatarState::Loading {
            return false;
        }
        debug!("avatar hit at ({x}, {y})");
        stage.presenter.activate();
        true
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        let height = self.height as f32;
        if let Some(stage) = &mut self.stage {
            stage.controls.drag(dx, dy, height);
        }
    }

    pub fn zoom(&mut self, steps: f32) -> bool {
        self.stage
            .as_mut()
            .is_some_and(|stage| stage.controls.zoom(steps))
    }

    pub fn pan(&mut self, dx: f32, dy: f32) -> bool {
        let height = self.height as f32;
        self.stage.as_mut().is_some_and(|stage| {
            let fovy = stage.camera.get_frustum().fovy();
            stage.controls.pan(dx, dy, height, fovy)
        })
    }
}

fn for_each_mesh(
    model: &AvatarModel,
    world: &[Mat4<f32>],
    mut f: impl FnMut(&Mesh, &Mat4<f32>),
) {
    for (node, matrix) in model.nodes.iter().zip(world) {
        for &index in &node.meshes {
            if let Some(mesh) = model.meshes.get(index) {
                f(mesh, matrix);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::ShadeLight;
    use crate::renderer::BACKGROUND;
    use std::cell::Cell;
    use std::rc::Rc;

    fn host(ssaa: usize, clicks: Rc<Cell<u32>>) -> SceneHost {
        let dir = std::env::temp_dir().join("metabot-stage-no-such-dir");
        SceneHost::new(
            ConfigLoader::resolved(ModelConfig::default()),
            Location::file(dir.join("robot.glb")),
            80,
            60,
            ssaa,
            Box::new(move || clicks.set(clicks.get() + 1)),
        )
    }

    #[test]
    fn nothing_is_drawn_before_mount() {
        let mut scene = host(1, Rc::default());
        assert!(!scene.is_ready());
        scene.render();
        assert!(scene.frame_buffer().data.iter().all(|&c| c == BACKGROUND));
        assert!(!scene.pointer_down(40, 30));
    }

    #[test]
    fn missing_asset_mounts_fallback_and_reacts_to_clicks() {
        let clicks = Rc::new(Cell::new(0));
        let mut scene = host(2, clicks.clone());
        assert_eq!(scene.wait_until_loaded(), AvatarState::FallbackActive);
        scene.frame(1.0 / 60.0);
        scene.render();

        let fb = scene.frame_buffer();
        assert_eq!((fb.width, fb.height), (80, 60));
        assert_eq!(fb.tag_at(40, 30), AVATAR_TAG);
        drop(fb);

        assert!(!scene.pointer_down(0, 0));
        assert!(scene.pointer_down(40, 30));
        assert_eq!(clicks.get(), 1);
        let now = 1.0 / 60.0;
        assert!(scene.presenter().unwrap().bounce().is_active(now));
    }

    #[test]
    fn tracking_light_starts_at_the_camera() {
        let mut scene = host(1, Rc::default());
        scene.wait_until_loaded();
        let rig = scene.rig().unwrap();
        assert_eq!(rig.tracked_position(), scene.camera().unwrap().eye);
        let directional = rig
            .shade_lights()
            .iter()
            .filter(|l| matches!(l, ShadeLight::Directional { .. }))
            .count();
        // 主光、补光、轮廓光和相机光
        assert_eq!(directional, 4);
    }

    #[test]
    fn tracking_light_follows_orbit() {
        let mut scene = host(1, Rc::default());
        scene.wait_until_loaded();
        scene.frame(0.0);
        let before = scene.rig().unwrap().tracked_position();
        scene.orbit(20.0, 0.0);
        scene.frame(0.0);
        let after = scene.rig().unwrap().tracked_position();
        assert_ne!(before, after);
        assert_eq!(after, scene.camera().unwrap().eye);
    }

    #[test]
    fn default_controls_refuse_zoom_and_pan() {
        let mut scene = host(1, Rc::default());
        scene.wait_until_loaded();
        assert!(!scene.zoom(1.0));
        assert!(!scene.pan(5.0, 5.0));
    }
}
