//! 关键帧动画片段，以及把它们作用到模型节点姿态上的混合器

use cgmath::{InnerSpace, Quaternion, Vector3 as Vec3, VectorSpace};
use log::debug;

use crate::config::AnimationSettings;

/// 单个节点的局部平移/旋转/缩放
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: Vec3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vec3<f32>,
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            translation: Vec3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Trs {
    pub fn from_translation(translation: Vec3<f32>) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.translation)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Keyframes {
    Translation(Vec<Vec3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vec3<f32>>),
}

impl Keyframes {
    fn len(&self) -> usize {
        match self {
            Keyframes::Translation(v) | Keyframes::Scale(v) => v.len(),
            Keyframes::Rotation(v) => v.len(),
        }
    }
}

/// 单个节点的一个动画属性
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub node: usize,
    pub times: Vec<f32>,
    pub keyframes: Keyframes,
    pub interpolation: Interpolation,
}

impl Track {
    /// `t` 时刻或之前的关键帧索引，以及向下一关键帧的混合系数
    fn locate(&self, t: f32) -> (usize, usize, f32) {
        let last = self.times.len().min(self.keyframes.len()).saturating_sub(1);
        if last == 0 || t <= self.times[0] {
            return (0, 0, 0.0);
        }
        if t >= self.times[last] {
            return (last, last, 0.0);
        }
        let next = self.times.partition_point(|&k| k <= t).min(last);
        let prev = next - 1;
        let span = self.times[next] - self.times[prev];
        let f = if span > 0.0 { (t - self.times[prev]) / span } else { 0.0 };
        match self.interpolation {
            Interpolation::Step => (prev, prev, 0.0),
            Interpolation::Linear => (prev, next, f),
        }
    }

    pub fn apply(&self, t: f32, pose: &mut [Trs]) {
        let Some(target) = pose.get_mut(self.node) else {
            return;
        };
        if self.times.is_empty() || self.keyframes.len() == 0 {
            return;
        }
        let (a, b, f) = self.locate(t);
        match &self.keyframes {
            Keyframes::Translation(v) => target.translation = v[a].lerp(v[b], f),
            Keyframes::Scale(v) => target.scale = v[a].lerp(v[b], f),
            Keyframes::Rotation(v) => {
                let (qa, mut qb) = (v[a], v[b]);
                // 走较短的一侧
                if qa.dot(qb) < 0.0 {
                    qb = -qb;
                }
                target.rotation = qa.nlerp(qb, f).normalize();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl Clip {
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .filter_map(|t| t.times.last().copied())
            .fold(0.0, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Repeat,
    Once,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipAction {
    pub clip: usize,
    pub time: f32,
    pub rate: f32,
    pub mode: LoopMode,
    pub finished: bool,
}

impl ClipAction {
    fn advance(&mut self, delta: f32, duration: f32) {
        if self.finished {
            return;
        }
        self.time += delta * self.rate;
        if duration <= 0.0 {
            return;
        }
        match self.mode {
            LoopMode::Repeat => self.time = self.time.rem_euclid(duration),
            LoopMode::Once => {
                if self.time >= duration || self.time < 0.0 {
                    self.finished = true;
                }
            }
        }
    }
}

/// 一个模型上正在运行的动画集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationMixer {
    actions: Vec<ClipAction>,
}

impl AnimationMixer {
    /// 选择要播放的动画，未知名称被跳过
    pub fn new(clips: &[Clip], settings: &AnimationSettings) -> Self {
        let indices: Vec<usize> = if settings.play.is_empty() {
            (0..clips.len()).collect()
        } else {
            let mut picked = Vec::new();
            for name in &settings.play {
                match clips.iter().position(|c| &c.name == name) {
                    Some(i) if !picked.contains(&i) => picked.push(i),
                    Some(_) => {}
                    None => debug!("no animation clip named {name:?}; skipping"),
                }
            }
            picked
        };

        let rate = settings.time_scale as f32;
        let mode = if settings.looping { LoopMode::Repeat } else { LoopMode::Once };
        let actions = indices
            .into_iter()
            .map(|clip| ClipAction {
                clip,
                // 反向播放的单次动画从末尾开始
                time: if rate < 0.0 && mode == LoopMode::Once { clips[clip].duration } else { 0.0 },
                rate,
                mode,
                finished: false,
            })
            .collect();
        Self { actions }
    }

    pub fn actions(&self) -> &[ClipAction] {
        &self.actions
    }

    pub fn advance(&mut self, clips: &[Clip], delta: f32) {
        for action in &mut self.actions {
            let duration = clips.get(action.clip).map_or(0.0, |c| c.duration);
            action.advance(delta, duration);
        }
    }

    /// 把每个活动动画的采样写入 `pose`，后面的覆盖前面的
    pub fn apply(&self, clips: &[Clip], pose: &mut [Trs]) {
        for action in self.actions.iter().filter(|a| !a.finished) {
            let Some(clip) = clips.get(action.clip) else {
                continue;
            };
            for track in &clip.tracks {
                track.apply(action.time, pose);
            }
        }
    }
}
