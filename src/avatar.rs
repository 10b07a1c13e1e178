//! 模型展示器。
//!
//! 持有一个挂载的模型：资源加载、主模型与内置备用模型
//! 之间的切换、来自配置的摆放、动画播放、
//! 空闲旋转和点击弹跳。

use cgmath::{Euler, Matrix4 as Mat4, Quaternion, Rad, Rotation3, Vector3 as Vec3};
use log::{info, warn};

use crate::animation::{AnimationMixer, Trs};
use crate::asset::load_asset;
use crate::config::{AnimationSettings, MaterialTuning, ModelSettings, vec3_to_f32};
use crate::error::AssetError;
use crate::fallback;
use crate::fetch::Location;
use crate::model::{AvatarModel, ROOT};
use crate::pending::{Pending, Settled};

/// 在配置的旋转之上每秒增加的偏航角
pub const IDLE_SPIN_RATE: f32 = 0.3;
pub const BOUNCE_DURATION: f32 = 2.0;
pub const BOUNCE_FREQUENCY: f32 = 5.0;
pub const BOUNCE_AMPLITUDE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarState {
    Loading,
    Loaded,
    FallbackActive,
}

/// 实际在舞台上的模型，标明其来源
#[derive(Debug, Clone, PartialEq)]
pub enum AvatarSource {
    Primary(AvatarModel),
    Fallback(AvatarModel),
}

impl AvatarSource {
    pub fn from_result(result: Result<AvatarModel, AssetError>) -> Self {
        match result {
            Ok(model) => AvatarSource::Primary(model),
            Err(err) => {
                warn!("avatar asset unavailable ({err}); showing the built-in robot");
                AvatarSource::Fallback(fallback::metabot())
            }
        }
    }

    pub fn state(&self) -> AvatarState {
        match self {
            AvatarSource::Primary(_) => AvatarState::Loaded,
            AvatarSource::Fallback(_) => AvatarState::FallbackActive,
        }
    }

    pub fn model(&self) -> &AvatarModel {
        match self {
            AvatarSource::Primary(model) | AvatarSource::Fallback(model) => model,
        }
    }

    fn model_mut(&mut self) -> &mut AvatarModel {
        match self {
            AvatarSource::Primary(model) | AvatarSource::Fallback(model) => model,
        }
    }
}

/// 由 [`ModelSettings`] 得到的根节点摆放，此处转为弧度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3<f32>,
    pub rotation: Euler<Rad<f32>>,
    pub scale: f32,
}

impl Placement {
    pub fn from_settings(settings: &ModelSettings) -> Self {
        let [x, y, z] = settings.rotation_radians();
        Self {
            position: vec3_to_f32(settings.position),
            rotation: Euler::new(Rad(x as f32), Rad(y as f32), Rad(z as f32)),
            scale: settings.scale as f32,
        }
    }

    /// 叠加了旋转和弹跳的根节点 TRS
    pub fn root_trs(&self, spin: f32, bounce: f32) -> Trs {
        Trs {
            translation: self.position + Vec3::new(0.0, bounce, 0.0),
            rotation: Quaternion::from_angle_y(Rad(spin)) * Quaternion::from(self.rotation),
            scale: Vec3::new(self.scale, self.scale, self.scale),
        }
    }
}

/// 点击弹跳。新的激活会重新开始计时，而不是叠加
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounce {
    started_at: Option<f32>,
}

impl Bounce {
    pub fn trigger(&mut self, now: f32) {
        self.started_at = Some(now);
    }

    pub fn is_active(&self, now: f32) -> bool {
        self.started_at
            .is_some_and(|t0| now - t0 >= 0.0 && now - t0 < BOUNCE_DURATION)
    }

    pub fn offset(&self, now: f32) -> f32 {
        match self.started_at {
            Some(t0) if self.is_active(now) => {
                ((now - t0) * BOUNCE_FREQUENCY).sin() * BOUNCE_AMPLITUDE
            }
            _ => 0.0,
        }
    }
}

/// 渲染循环传入的逐帧时间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub elapsed: f32,
    pub delta: f32,
}

pub struct AvatarPresenter {
    source: Option<AvatarSource>,
    pending: Option<Pending<Result<AvatarModel, AssetError>>>,
    model_settings: ModelSettings,
    animation_settings: AnimationSettings,
    tuning: Option<MaterialTuning>,
    placement: Placement,
    mixer: AnimationMixer,
    pose: Vec<Trs>,
    spin: f32,
    bounce: Bounce,
    now: f32,
    on_interact: Box<dyn FnMut()>,
}

impl AvatarPresenter {
    fn with_settings(
        model: &ModelSettings,
        animations: &AnimationSettings,
        tuning: Option<&MaterialTuning>,
        on_interact: Box<dyn FnMut()>,
    ) -> Self {
        Self {
            source: None,
            pending: None,
            model_settings: model.clone(),
            animation_settings: animations.clone(),
            tuning: tuning.cloned(),
            placement: Placement::from_settings(model),
            mixer: AnimationMixer::default(),
            pose: Vec::new(),
            spin: 0.0,
            bounce: Bounce::default(),
            now: 0.0,
            on_interact,
        }
    }

    /// 在后台开始加载 `location`；加载结束前状态为 `Loading`
    pub fn spawn(
        location: Location,
        model: &ModelSettings,
        animations: &AnimationSettings,
        tuning: Option<&MaterialTuning>,
        on_interact: Box<dyn FnMut()>,
    ) -> Self {
        let mut presenter = Self::with_settings(model, animations, tuning, on_interact);
        let target = location.clone();
        match Pending::spawn("avatar-loader", move || load_asset(&target)) {
            Ok(pending) => presenter.pending = Some(pending),
            Err(err) => {
                warn!("could not start loading {location}: {err}");
                presenter.install(AvatarSource::Fallback(fallback::metabot()));
            }
        }
        presenter
    }

    /// 加载已结束、结果为 `result` 的展示器
    pub fn settled(
        result: Result<AvatarModel, AssetError>,
        model: &ModelSettings,
        animations: &AnimationSettings,
        tuning: Option<&MaterialTuning>,
        on_interact: Box<dyn FnMut()>,
    ) -> Self {
        let mut presenter = Self::with_settings(model, animations, tuning, on_interact);
        presenter.install(AvatarSource::from_result(result));
        presenter
    }

    fn install(&mut self, mut source: AvatarSource) {
        if let Some(tuning) = &self.tuning {
            source.model_mut().apply_tuning(tuning);
        }
        let model = source.model();
        self.mixer = AnimationMixer::new(&model.clips, &self.animation_settings);
        self.pose = model.rest_pose();
        info!("avatar presenter is now {:?}", source.state());
        self.source = Some(source);
        self.refresh_root();
    }

    /// 检查进行中的资源加载
    pub fn poll(&mut self) -> AvatarState {
        if let Some(pending) = self.pending.as_mut() {
            if let Some(settled) = pending.try_take() {
                self.pending = None;
                let result = match settled {
                    Settled::Done(result) => result,
                    Settled::Lost => Err(AssetError::WorkerLost),
                };
                self.install(AvatarSource::from_result(result));
            }
        }
        self.state()
    }

    /// 阻塞直到资源加载结束
    pub fn wait(&mut self) -> AvatarState {
        if let Some(pending) = self.pending.take() {
            let result = match pending.wait() {
                Settled::Done(result) => result,
                Settled::Lost => Err(AssetError::WorkerLost),
            };
            self.install(AvatarSource::from_result(result));
        }
        self.state()
    }

    pub fn state(&self) -> AvatarState {
        self.source.as_ref().map_or(AvatarState::Loading, AvatarSource::state)
    }

    pub fn source(&self) -> Option<&AvatarSource> {
        self.source.as_ref()
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn bounce(&self) -> &Bounce {
        &self.bounce
    }

    pub fn spin(&self) -> f32 {
        self.spin
    }

    /// 模型设置变化时重新计算摆放
    pub fn set_model_settings(&mut self, settings: &ModelSettings) {
        if &self.model_settings == settings {
            return;
        }
        self.model_settings = settings.clone();
        self.placement = Placement::from_settings(settings);
        self.refresh_root();
    }

    /// 动画设置变化时重新开始播放
    pub fn set_animation_settings(&mut self, settings: &AnimationSettings) {
        if &self.animation_settings == settings {
            return;
        }
        self.animation_settings = settings.clone();
        if let Some(source) = &self.source {
            self.mixer = AnimationMixer::new(&source.model().clips, settings);
        }
    }

    /// 用户对模型的激活（点击/轻触）
    pub fn activate(&mut self) {
        self.bounce.trigger(self.now);
        (self.on_interact)();
    }

    /// 将动画、旋转和弹跳推进一帧
    pub fn update(&mut self, time: FrameTime) {
        self.now = time.elapsed;
        let Some(source) = &self.source else {
            return;
        };
        let model = source.model();
        self.spin += IDLE_SPIN_RATE * time.delta;
        self.mixer.advance(&model.clips, time.delta);
        self.pose = model.rest_pose();
        self.mixer.apply(&model.clips, &mut self.pose);
        self.refresh_root();
    }

    fn refresh_root(&mut self) {
        if let Some(root) = self.pose.get_mut(ROOT) {
            *root = self.placement.root_trs(self.spin, self.bounce.offset(self.now));
        }
    }

    /// 当前根节点 TRS（舞台上有模型时）
    pub fn root(&self) -> Option<Trs> {
        self.pose.get(ROOT).copied()
    }

    /// 当前姿态的世界矩阵
    pub fn world_matrices(&self) -> Option<(&AvatarModel, Vec<Mat4<f32>>)> {
        let model = self.source.as_ref()?.model();
        Some((model, model.world_matrices(&self.pose)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::animation::{Clip, Interpolation, Keyframes, Track};
    use crate::error::FetchError;

    fn counter() -> (Rc<Cell<u32>>, Box<dyn FnMut()>) {
        let hits = Rc::new(Cell::new(0));
        let inner = Rc::clone(&hits);
        (hits, Box::new(move || inner.set(inner.get() + 1)))
    }

    fn unavailable() -> Result<AvatarModel, AssetError> {
        Err(AssetError::Fetch(FetchError::Status {
            url: "http://localhost/robot.glb".into(),
            status: 404,
        }))
    }

    fn presenter(result: Result<AvatarModel, AssetError>, model: ModelSettings) -> (AvatarPresenter, Rc<Cell<u32>>) {
        let (hits, callback) = counter();
        let p = AvatarPresenter::settled(result, &model, &AnimationSettings::default(), None, callback);
        (p, hits)
    }

    #[test]
    fn failed_load_activates_fallback() {
        let (p, _) = presenter(unavailable(), ModelSettings::default());
        assert_eq!(p.state(), AvatarState::FallbackActive);
        let model = p.source().unwrap().model();
        assert_eq!(model.nodes[ROOT].name, "metabot");
        assert!(model.triangle_count() > 0);
    }

    #[test]
    fn successful_load_is_primary() {
        let (p, _) = presenter(Ok(fallback::metabot()), ModelSettings::default());
        assert_eq!(p.state(), AvatarState::Loaded);
        assert!(matches!(p.source(), Some(AvatarSource::Primary(_))));
    }

    #[test]
    fn background_load_of_missing_file_settles_on_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let (_, callback) = counter();
        let mut p = AvatarPresenter::spawn(
            Location::file(dir.path().join("robot.glb")),
            &ModelSettings::default(),
            &AnimationSettings::default(),
            None,
            callback,
        );
        assert_eq!(p.wait(), AvatarState::FallbackActive);
        assert_eq!(p.poll(), AvatarState::FallbackActive);
    }

    #[test]
    fn placement_lands_on_the_root_node() {
        let settings = ModelSettings {
            scale: 2.0,
            position: [1.0, -1.0, 0.5],
            rotation: [0.0, 90.0, 0.0],
        };
        let (p, _) = presenter(Ok(fallback::metabot()), settings);
        let root = p.root().unwrap();
        assert_eq!(root.scale, Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(root.translation, Vec3::new(1.0, -1.0, 0.5));
        let expected = Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_2));
        assert!((root.rotation.s - expected.s).abs() < 1e-6);
        assert!((root.rotation.v.y - expected.v.y).abs() < 1e-6);
        // 子节点保持原有偏移
        let model = p.source().unwrap().model();
        assert_eq!(model.nodes[2].rest.translation, Vec3::new(0.0, 1.5, 0.0));
    }

    #[test]
    fn model_settings_change_reapplies_placement() {
        let (mut p, _) = presenter(Ok(fallback::metabot()), ModelSettings::default());
        p.set_model_settings(&ModelSettings {
            scale: 0.5,
            ..Default::default()
        });
        assert_eq!(p.root().unwrap().scale, Vec3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn activation_bounces_and_calls_back_each_time() {
        let (mut p, hits) = presenter(Ok(fallback::metabot()), ModelSettings::default());
        p.update(FrameTime { elapsed: 10.0, delta: 0.0 });
        p.activate();
        assert_eq!(hits.get(), 1);

        p.update(FrameTime { elapsed: 10.25, delta: 0.25 });
        let y = p.root().unwrap().translation.y;
        assert!((y - (0.25 * BOUNCE_FREQUENCY).sin() * BOUNCE_AMPLITUDE).abs() < 1e-6);

        // 时间窗内的第二次激活会重新开始
        p.activate();
        assert_eq!(hits.get(), 2);
        p.update(FrameTime { elapsed: 11.5, delta: 1.25 });
        assert!(p.bounce().is_active(11.5));
        let y = p.root().unwrap().translation.y;
        assert!((y - (1.25 * BOUNCE_FREQUENCY).sin() * BOUNCE_AMPLITUDE).abs() < 1e-6);

        // 原时间窗本应在 12.0 结束，重新开始后持续到 12.25
        p.update(FrameTime { elapsed: 12.1, delta: 0.6 });
        assert!(p.bounce().is_active(12.1));
        p.update(FrameTime { elapsed: 12.3, delta: 0.2 });
        assert!(!p.bounce().is_active(12.3));
        assert_eq!(p.root().unwrap().translation.y, 0.0);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn bounce_is_layered_on_the_configured_height() {
        let settings = ModelSettings {
            position: [0.0, -1.0, 0.0],
            ..Default::default()
        };
        let (mut p, _) = presenter(Ok(fallback::metabot()), settings);
        p.activate();
        p.update(FrameTime { elapsed: 0.1, delta: 0.1 });
        let y = p.root().unwrap().translation.y;
        assert!((y - (-1.0 + (0.5f32).sin() * BOUNCE_AMPLITUDE)).abs() < 1e-6);
    }

    #[test]
    fn idle_spin_accumulates() {
        let (mut p, _) = presenter(Ok(fallback::metabot()), ModelSettings::default());
        p.update(FrameTime { elapsed: 1.0, delta: 1.0 });
        p.update(FrameTime { elapsed: 2.0, delta: 1.0 });
        assert!((p.spin() - 2.0 * IDLE_SPIN_RATE).abs() < 1e-6);
    }

    #[test]
    fn clips_drive_child_nodes() {
        let mut model = fallback::metabot();
        model.clips.push(Clip::new(
            "wave",
            vec![Track {
                node: 5,
                times: vec![0.0, 1.0],
                keyframes: Keyframes::Translation(vec![
                    Vec3::new(-1.0, 0.0, 0.0),
                    Vec3::new(-1.0, 1.0, 0.0),
                ]),
                interpolation: Interpolation::Linear,
            }],
        ));
        let (mut p, _) = presenter(Ok(model), ModelSettings::default());
        assert_eq!(p.mixer().actions().len(), 1);
        p.update(FrameTime { elapsed: 0.5, delta: 0.5 });
        let (_, world) = p.world_matrices().unwrap();
        assert!((world[5].w.y - 0.5).abs() < 1e-5);

        p.set_animation_settings(&AnimationSettings {
            play: vec!["missing".into()],
            ..Default::default()
        });
        assert!(p.mixer().actions().is_empty());
    }

    #[test]
    fn material_tuning_applies_to_fallback() {
        let (_, callback) = counter();
        let tuning = MaterialTuning {
            metalness: 0.0,
            ..Default::default()
        };
        let p = AvatarPresenter::settled(
            unavailable(),
            &ModelSettings::default(),
            &AnimationSettings::default(),
            Some(&tuning),
            callback,
        );
        let model = p.source().unwrap().model();
        assert!(model.materials.iter().all(|m| m.metalness == 0.0));
    }
}
