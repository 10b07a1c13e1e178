//! 模型配置文档的类型化形式。
//!
//! 每个字段都有内置默认值；[`ModelConfig::default`] 就是
//! 没有配置文档时使用的配置。角度以角度制给出，
//! 只在渲染边界处转换为弧度
//! （[`degrees_to_radians`]、[`ModelSettings::rotation_radians`]）。

use serde::{Deserialize, Serialize};

use crate::color::Color;

pub type Vec3Config = [f64; 3];

pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn vec3_to_f32(v: Vec3Config) -> cgmath::Vector3<f32> {
    cgmath::Vector3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    pub model: ModelSettings,
    pub material: Option<MaterialTuning>,
    pub animations: AnimationSettings,
    pub lighting: LightingSettings,
    pub camera: CameraSettings,
    pub shadows: ShadowSettings,
    pub rendering: Option<RenderingSettings>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            material: None,
            animations: AnimationSettings::default(),
            lighting: LightingSettings::default(),
            camera: CameraSettings::default(),
            shadows: ShadowSettings::default(),
            rendering: None,
        }
    }
}

/// 模型根节点的摆放
///
/// `scale` 必须为正，由配置作者保证
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    pub scale: f64,
    pub position: Vec3Config,
    /// XYZ 欧拉角，角度制
    pub rotation: Vec3Config,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
        }
    }
}

impl ModelSettings {
    pub fn rotation_radians(&self) -> Vec3Config {
        self.rotation.map(degrees_to_radians)
    }
}

/// 应用于展示模型所有材质的倍率
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialTuning {
    pub env_map_intensity: f64,
    pub emissive_intensity: f64,
    pub metalness: f64,
    pub roughness: f64,
}

impl Default for MaterialTuning {
    fn default() -> Self {
        Self {
            env_map_intensity: 1.0,
            emissive_intensity: 1.0,
            metalness: 1.0,
            roughness: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationSettings {
    /// 按顺序播放的动画名称，为空表示全部播放
    pub play: Vec<String>,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub time_scale: f64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            play: Vec::new(),
            looping: true,
            time_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LightingSettings {
    pub hemisphere: HemisphereLightSettings,
    pub ambient: AmbientLightSettings,
    pub point_lights: PointLightSettings,
    pub key: DirectionalLightSettings,
    pub fill: DirectionalLightSettings,
    pub rim: DirectionalLightSettings,
    pub camera: CameraLightSettings,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            hemisphere: HemisphereLightSettings::default(),
            ambient: AmbientLightSettings::default(),
            point_lights: PointLightSettings::default(),
            key: DirectionalLightSettings {
                enabled: true,
                position: [5.0, 10.0, 5.0],
                intensity: 0.6,
                color: Color::WHITE,
                cast_shadow: true,
            },
            fill: DirectionalLightSettings {
                enabled: true,
                position: [-5.0, 5.0, -5.0],
                intensity: 0.3,
                color: Color::from_hex(0x88ccff),
                cast_shadow: false,
            },
            rim: DirectionalLightSettings {
                enabled: true,
                position: [0.0, 5.0, -10.0],
                intensity: 0.4,
                color: Color::WHITE,
                cast_shadow: false,
            },
            camera: CameraLightSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HemisphereLightSettings {
    pub enabled: bool,
    pub sky_color: Color,
    pub ground_color: Color,
    pub intensity: f64,
}

impl Default for HemisphereLightSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sky_color: Color::WHITE,
            ground_color: Color::from_hex(0x444444),
            intensity: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmbientLightSettings {
    pub enabled: bool,
    pub intensity: f64,
    pub color: Color,
}

impl Default for AmbientLightSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 0.4,
            color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointLightSettings {
    pub enabled: bool,
    /// 生成的阵列灯光相对模型原点的偏移
    pub distance: f64,
    pub lights: Vec<PointLightEntry>,
}

impl Default for PointLightSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            distance: 5.0,
            lights: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointLightEntry {
    pub position: Vec3Config,
    pub intensity: f64,
    /// 衰减距离，0 表示不衰减
    pub distance: f64,
    pub color: Color,
}

impl Default for PointLightEntry {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            intensity: 1.0,
            distance: 0.0,
            color: Color::WHITE,
        }
    }
}

/// 主光、补光和轮廓光共用此结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectionalLightSettings {
    pub enabled: bool,
    pub position: Vec3Config,
    pub intensity: f64,
    pub color: Color,
    pub cast_shadow: bool,
}

impl Default for DirectionalLightSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            position: [0.0, 10.0, 0.0],
            intensity: 1.0,
            color: Color::WHITE,
            cast_shadow: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraLightSettings {
    pub enabled: bool,
    pub intensity: f64,
    pub color: Color,
}

impl Default for CameraLightSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 0.8,
            color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraSettings {
    pub position: Vec3Config,
    /// 垂直视场角，角度制
    pub fov: f64,
    pub controls: ControlSettings,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 1.0, 6.0],
            fov: 45.0,
            controls: ControlSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlSettings {
    pub enable_pan: bool,
    pub enable_zoom: bool,
    /// 与 +Y 轴的夹角，角度制
    pub min_polar_angle: f64,
    /// 与 +Y 轴的夹角，角度制
    pub max_polar_angle: f64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            enable_pan: false,
            enable_zoom: false,
            min_polar_angle: 60.0,
            max_polar_angle: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub ground: GroundSettings,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ground: GroundSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundSettings {
    pub visible: bool,
    pub position: Vec3Config,
    pub opacity: f64,
}

impl Default for GroundSettings {
    fn default() -> Self {
        Self {
            visible: true,
            position: [0.0, -2.0, 0.0],
            opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderingSettings {
    pub tone_mapping: ToneMappingMode,
    pub exposure: f64,
    pub environment: EnvironmentSettings,
}

impl Default for RenderingSettings {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMappingMode::Aces,
            exposure: 1.0,
            environment: EnvironmentSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneMappingMode {
    #[serde(alias = "NoToneMapping")]
    None,
    #[serde(alias = "LinearToneMapping")]
    Linear,
    #[serde(alias = "ReinhardToneMapping")]
    Reinhard,
    #[serde(alias = "ACESFilmicToneMapping", alias = "acesfilmic")]
    Aces,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentSettings {
    pub enabled: bool,
    pub preset: EnvironmentPreset,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: EnvironmentPreset::Studio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentPreset {
    Apartment,
    City,
    Dawn,
    Forest,
    Lobby,
    Night,
    Park,
    Studio,
    Sunset,
    Warehouse,
}

impl EnvironmentPreset {
    /// 代替预设 HDR 贴图的天空和地面色调
    pub fn tints(self) -> (Color, Color) {
        let (sky, ground) = match self {
            EnvironmentPreset::Apartment => (0xf2e6d8, 0x6b5a4a),
            EnvironmentPreset::City => (0xc9d6e3, 0x4d4f52),
            EnvironmentPreset::Dawn => (0xf7c8a0, 0x4a3d52),
            EnvironmentPreset::Forest => (0xbfd8b0, 0x2f3d24),
            EnvironmentPreset::Lobby => (0xf0e8dc, 0x5e5448),
            EnvironmentPreset::Night => (0x2a3550, 0x0c0e14),
            EnvironmentPreset::Park => (0xcfe3f5, 0x4f6b38),
            EnvironmentPreset::Studio => (0xffffff, 0x808080),
            EnvironmentPreset::Sunset => (0xffb27a, 0x5a3a30),
            EnvironmentPreset::Warehouse => (0xe0dcd2, 0x47443f),
        };
        (Color::from_hex(sky), Color::from_hex(ground))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn quarter_turns_convert_to_radians() {
        let cases = [(0.0, 0.0), (90.0, PI / 2.0), (180.0, PI), (270.0, 3.0 * PI / 2.0)];
        for (degrees, radians) in cases {
            assert!((degrees_to_radians(degrees) - radians).abs() < 1e-9, "{degrees}");
        }
    }

    #[test]
    fn model_rotation_is_converted_per_axis() {
        let settings = ModelSettings {
            rotation: [90.0, 180.0, 270.0],
            ..Default::default()
        };
        let r = settings.rotation_radians();
        assert!((r[0] - PI / 2.0).abs() < 1e-9);
        assert!((r[1] - PI).abs() < 1e-9);
        assert!((r[2] - 3.0 * PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn defaults_enable_every_light() {
        let lighting = ModelConfig::default().lighting;
        assert!(lighting.hemisphere.enabled);
        assert!(lighting.ambient.enabled);
        assert!(lighting.point_lights.enabled);
        assert!(lighting.key.enabled && lighting.key.cast_shadow);
        assert!(lighting.fill.enabled && !lighting.fill.cast_shadow);
        assert!(lighting.rim.enabled);
        assert!(lighting.camera.enabled);
        assert_eq!(lighting.fill.color, Color::from_hex(0x88ccff));
    }

    #[test]
    fn tone_mapping_accepts_three_js_names() {
        let mode: ToneMappingMode = serde_yaml::from_str("ACESFilmicToneMapping").unwrap();
        assert_eq!(mode, ToneMappingMode::Aces);
        let mode: ToneMappingMode = serde_yaml::from_str("reinhard").unwrap();
        assert_eq!(mode, ToneMappingMode::Reinhard);
        assert!(serde_yaml::from_str::<ToneMappingMode>("filmic-ish").is_err());
    }

    #[test]
    fn default_survives_yaml_round_trip() {
        let config = ModelConfig::default();
        let text = serde_yaml::to_string(&config).unwrap();
        let back: ModelConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
