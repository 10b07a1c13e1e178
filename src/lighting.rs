//! 灯光组构建。
//!
//! 把解析后的灯光配置转换为有序的灯光描述列表，
//! 在模型周围生成点光源阵列，每帧更新跟随相机的灯光，
//! 并推导出地面阴影平面。

use cgmath::{InnerSpace, Vector3 as Vec3, Zero};

use crate::color::Color;
use crate::config::{DirectionalLightSettings, LightingSettings, ShadowSettings, vec3_to_f32};

/// 生成的阵列点光源强度
pub const GENERATED_INTENSITY: f32 = 1.0;
/// 生成的阵列点光源衰减距离
pub const GENERATED_FALLOFF: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionalRole {
    Key,
    Fill,
    Rim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOrigin {
    Configured,
    Generated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightDescriptor {
    Hemisphere {
        sky: Color,
        ground: Color,
        intensity: f32,
    },
    Ambient {
        color: Color,
        intensity: f32,
    },
    Point {
        origin: PointOrigin,
        position: Vec3<f32>,
        color: Color,
        intensity: f32,
        /// 0 表示不衰减
        distance: f32,
    },
    Directional {
        role: DirectionalRole,
        position: Vec3<f32>,
        target: Vec3<f32>,
        color: Color,
        intensity: f32,
        cast_shadow: bool,
    },
    /// 位置跟随观察者的平行光，目标为世界原点
    CameraTracking { color: Color, intensity: f32 },
}

/// 以 `center` 为中心，每轴取 `{-d, 0, +d}` 的所有非零组合
pub fn generate_light_positions(center: Vec3<f32>, distance: f32) -> Vec<Vec3<f32>> {
    let mut positions = Vec::with_capacity(26);
    for x in -1i8..=1 {
        for y in -1i8..=1 {
            for z in -1i8..=1 {
                if (x, y, z) == (0, 0, 0) {
                    continue;
                }
                let offset = Vec3::new(x as f32, y as f32, z as f32) * distance;
                positions.push(center + offset);
            }
        }
    }
    positions
}

fn directional(role: DirectionalRole, settings: &DirectionalLightSettings) -> Option<LightDescriptor> {
    settings.enabled.then(|| LightDescriptor::Directional {
        role,
        position: vec3_to_f32(settings.position),
        target: Vec3::zero(),
        color: settings.color,
        intensity: settings.intensity as f32,
        cast_shadow: settings.cast_shadow,
    })
}

/// 构建有序的描述列表：半球光、环境光、配置的点光源、
/// 生成的点光源、主光、补光、轮廓光、相机跟随光
pub fn build(lighting: &LightingSettings, model_origin: Vec3<f32>) -> Vec<LightDescriptor> {
    let mut lights = Vec::new();

    let hemi = &lighting.hemisphere;
    if hemi.enabled {
        lights.push(LightDescriptor::Hemisphere {
            sky: hemi.sky_color,
            ground: hemi.ground_color,
            intensity: hemi.intensity as f32,
        });
    }
    if lighting.ambient.enabled {
        lights.push(LightDescriptor::Ambient {
            color: lighting.ambient.color,
            intensity: lighting.ambient.intensity as f32,
        });
    }

    let points = &lighting.point_lights;
    if points.enabled {
        lights.extend(points.lights.iter().map(|entry| LightDescriptor::Point {
            origin: PointOrigin::Configured,
            position: vec3_to_f32(entry.position),
            color: entry.color,
            intensity: entry.intensity as f32,
            distance: entry.distance as f32,
        }));
        lights.extend(
            generate_light_positions(model_origin, points.distance as f32)
                .into_iter()
                .map(|position| LightDescriptor::Point {
                    origin: PointOrigin::Generated,
                    position,
                    color: Color::WHITE,
                    intensity: GENERATED_INTENSITY,
                    distance: GENERATED_FALLOFF,
                }),
        );
    }

    lights.extend(directional(DirectionalRole::Key, &lighting.key));
    lights.extend(directional(DirectionalRole::Fill, &lighting.fill));
    lights.extend(directional(DirectionalRole::Rim, &lighting.rim));

    if lighting.camera.enabled {
        lights.push(LightDescriptor::CameraTracking {
            color: lighting.camera.color,
            intensity: lighting.camera.intensity as f32,
        });
    }
    lights
}

/// 片元阶段所需的灯光形式，线性颜色 × 强度
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadeLight {
    Hemisphere {
        sky: Vec3<f32>,
        ground: Vec3<f32>,
    },
    Ambient(Vec3<f32>),
    Point {
        position: Vec3<f32>,
        radiance: Vec3<f32>,
        distance: f32,
    },
    /// `direction` 由光源指向场景
    Directional {
        direction: Vec3<f32>,
        radiance: Vec3<f32>,
    },
}

/// 挂载后的灯光组：描述列表加上跟随光的逐帧状态
#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    descriptors: Vec<LightDescriptor>,
    tracked_position: Vec3<f32>,
}

impl LightRig {
    pub fn new(lighting: &LightingSettings, model_origin: Vec3<f32>) -> Self {
        Self {
            descriptors: build(lighting, model_origin),
            tracked_position: Vec3::zero(),
        }
    }

    pub fn descriptors(&self) -> &[LightDescriptor] {
        &self.descriptors
    }

    pub fn has_camera_light(&self) -> bool {
        self.descriptors
            .iter()
            .any(|d| matches!(d, LightDescriptor::CameraTracking { .. }))
    }

    /// 逐帧调用：把观察者位置写入跟随光
    pub fn track_camera(&mut self, camera_position: Vec3<f32>) {
        self.tracked_position = camera_position;
    }

    pub fn tracked_position(&self) -> Vec3<f32> {
        self.tracked_position
    }

    /// 投射阴影的平行光方向（光源 → 场景）
    pub fn shadow_directions(&self) -> Vec<Vec3<f32>> {
        self.descriptors
            .iter()
            .filter_map(|d| match d {
                LightDescriptor::Directional {
                    position,
                    target,
                    cast_shadow: true,
                    ..
                } => direction(*position, *target),
                _ => None,
            })
            .collect()
    }

    pub fn shade_lights(&self) -> Vec<ShadeLight> {
        self.descriptors
            .iter()
            .filter_map(|d| match *d {
                LightDescriptor::Hemisphere {
                    sky,
                    ground,
                    intensity,
                } => Some(ShadeLight::Hemisphere {
                    sky: sky.linear() * intensity,
                    ground: ground.linear() * intensity,
                }),
                LightDescriptor::Ambient { color, intensity } => {
                    Some(ShadeLight::Ambient(color.linear() * intensity))
                }
                LightDescriptor::Point {
                    position,
                    color,
                    intensity,
                    distance,
                    ..
                } => Some(ShadeLight::Point {
                    position,
                    radiance: color.linear() * intensity,
                    distance,
                }),
                LightDescriptor::Directional {
                    position,
                    target,
                    color,
                    intensity,
                    ..
                } => direction(position, target).map(|direction| ShadeLight::Directional {
                    direction,
                    radiance: color.linear() * intensity,
                }),
                LightDescriptor::CameraTracking { color, intensity } => {
                    direction(self.tracked_position, Vec3::zero()).map(|direction| {
                        ShadeLight::Directional {
                            direction,
                            radiance: color.linear() * intensity,
                        }
                    })
                }
            })
            .collect()
    }
}

fn direction(from: Vec3<f32>, to: Vec3<f32>) -> Option<Vec3<f32>> {
    let d = to - from;
    (d.magnitude2() > 0.0).then(|| d.normalize())
}

/// 朝上的平面，只接收阴影
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowPlane {
    pub position: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub opacity: f32,
}

pub fn shadow_plane(shadows: &ShadowSettings) -> Option<ShadowPlane> {
    (shadows.enabled && shadows.ground.visible).then(|| ShadowPlane {
        position: vec3_to_f32(shadows.ground.position),
        normal: Vec3::new(0.0, 1.0, 0.0),
        opacity: shadows.ground.opacity as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, PointLightEntry};
    use proptest::prelude::*;

    fn count_points(lights: &[LightDescriptor], want: PointOrigin) -> usize {
        lights
            .iter()
            .filter(|l| matches!(l, LightDescriptor::Point { origin, .. } if *origin == want))
            .count()
    }

    #[test]
    fn cage_has_26_distinct_symmetric_positions() {
        let positions = generate_light_positions(Vec3::zero(), 5.0);
        assert_eq!(positions.len(), 26);
        for (i, p) in positions.iter().enumerate() {
            assert_ne!(*p, Vec3::zero());
            assert!(positions.contains(&-*p), "{p:?} has no mirror");
            assert!(positions[i + 1..].iter().all(|q| q != p), "{p:?} repeated");
        }
    }

    #[test]
    fn zero_distance_stacks_the_cage_on_the_centre() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let positions = generate_light_positions(center, 0.0);
        assert_eq!(positions.len(), 26);
        assert!(positions.iter().all(|p| *p == center));
    }

    proptest! {
        #[test]
        fn cage_is_centred_on_the_model(
            cx in -10.0f32..10.0, cy in -10.0f32..10.0, cz in -10.0f32..10.0, d in 0.1f32..20.0,
        ) {
            let center = Vec3::new(cx, cy, cz);
            let positions = generate_light_positions(center, d);
            prop_assert_eq!(positions.len(), 26);
            let sum = positions.iter().fold(Vec3::zero(), |acc, p| acc + (*p - center));
            prop_assert!(sum.magnitude() < 1e-3);
            prop_assert!(positions.iter().all(|p| *p != center));
        }
    }

    #[test]
    fn default_rig_has_every_light() {
        let lights = build(&ModelConfig::default().lighting, Vec3::zero());
        assert!(matches!(lights[0], LightDescriptor::Hemisphere { .. }));
        assert!(matches!(lights[1], LightDescriptor::Ambient { .. }));
        assert_eq!(count_points(&lights, PointOrigin::Generated), 26);
        assert_eq!(count_points(&lights, PointOrigin::Configured), 0);
        let roles: Vec<_> = lights
            .iter()
            .filter_map(|l| match l {
                LightDescriptor::Directional { role, .. } => Some(*role),
                _ => None,
            })
            .collect();
        assert_eq!(roles, [DirectionalRole::Key, DirectionalRole::Fill, DirectionalRole::Rim]);
        assert!(matches!(lights.last(), Some(LightDescriptor::CameraTracking { .. })));
        assert_eq!(lights.len(), 2 + 26 + 3 + 1);
    }

    #[test]
    fn disabled_lights_are_left_out() {
        let mut lighting = ModelConfig::default().lighting;
        lighting.hemisphere.enabled = false;
        lighting.rim.enabled = false;
        lighting.camera.enabled = false;
        lighting.point_lights.enabled = false;
        lighting.point_lights.lights.push(PointLightEntry::default());
        let lights = build(&lighting, Vec3::zero());
        assert_eq!(lights.len(), 3);
        assert!(!LightRig::new(&lighting, Vec3::zero()).has_camera_light());
    }

    #[test]
    fn configured_points_come_before_the_cage() {
        let mut lighting = ModelConfig::default().lighting;
        lighting.point_lights.lights = vec![PointLightEntry {
            position: [0.0, 3.0, 0.0],
            intensity: 2.0,
            distance: 4.0,
            color: Color::from_hex(0xff0000),
        }];
        lighting.point_lights.distance = 2.0;
        let lights = build(&lighting, Vec3::new(0.0, 1.0, 0.0));
        match &lights[2] {
            LightDescriptor::Point {
                origin: PointOrigin::Configured,
                position,
                intensity,
                distance,
                ..
            } => {
                assert_eq!(*position, Vec3::new(0.0, 3.0, 0.0));
                assert_eq!(*intensity, 2.0);
                assert_eq!(*distance, 4.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &lights[3] {
            LightDescriptor::Point {
                origin: PointOrigin::Generated,
                position,
                intensity,
                distance,
                ..
            } => {
                assert_eq!(*position, Vec3::new(-2.0, -1.0, -2.0));
                assert_eq!(*intensity, GENERATED_INTENSITY);
                assert_eq!(*distance, GENERATED_FALLOFF);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn camera_light_follows_the_viewer() {
        let mut rig = LightRig::new(&ModelConfig::default().lighting, Vec3::zero());
        rig.track_camera(Vec3::new(0.0, 0.0, 6.0));
        let camera_dir = |rig: &LightRig| match rig.shade_lights().last() {
            Some(ShadeLight::Directional { direction, .. }) => *direction,
            other => panic!("unexpected {other:?}"),
        };
        assert!((camera_dir(&rig) - Vec3::new(0.0, 0.0, -1.0)).magnitude() < 1e-6);
        rig.track_camera(Vec3::new(6.0, 0.0, 0.0));
        assert!((camera_dir(&rig) - Vec3::new(-1.0, 0.0, 0.0)).magnitude() < 1e-6);
    }

    #[test]
    fn only_the_key_light_casts_shadows_by_default() {
        let rig = LightRig::new(&ModelConfig::default().lighting, Vec3::zero());
        let dirs = rig.shadow_directions();
        assert_eq!(dirs.len(), 1);
        assert!(dirs[0].y < 0.0);
    }

    #[test]
    fn shadow_plane_needs_both_flags() {
        let mut shadows = ModelConfig::default().shadows;
        let plane = shadow_plane(&shadows).unwrap();
        assert_eq!(plane.position, Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(plane.normal, Vec3::new(0.0, 1.0, 0.0));
        assert!((plane.opacity - 0.3).abs() < 1e-6);

        shadows.ground.visible = false;
        assert!(shadow_plane(&shadows).is_none());
        shadows.ground.visible = true;
        shadows.enabled = false;
        assert!(shadow_plane(&shadows).is_none());
    }
}
