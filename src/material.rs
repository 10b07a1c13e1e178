use cgmath::{Vector3 as Vec3, Zero};

use crate::color::Color;
use crate::config::MaterialTuning;

/// 金属度/粗糙度表面描述（线性颜色）
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: Vec3<f32>,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: Vec3<f32>,
    pub emissive_intensity: f32,
    pub env_map_intensity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self::standard("default", Color::from_hex(0xcccccc), 0.0, 1.0)
    }
}

impl Material {
    pub fn standard(name: &str, color: Color, metalness: f32, roughness: f32) -> Self {
        Self {
            name: name.to_string(),
            base_color: color.linear(),
            metalness,
            roughness,
            emissive: Vec3::zero(),
            emissive_intensity: 1.0,
            env_map_intensity: 1.0,
        }
    }

    pub fn with_emissive(mut self, emissive: Color, intensity: f32) -> Self {
        self.emissive = emissive.linear();
        self.emissive_intensity = intensity;
        self
    }

    /// 应用配置的倍率，金属度和粗糙度保持在 `0..=1`
    pub fn tuned(&self, tuning: &MaterialTuning) -> Self {
        Self {
            metalness: (self.metalness * tuning.metalness as f32).clamp(0.0, 1.0),
            roughness: (self.roughness * tuning.roughness as f32).clamp(0.0, 1.0),
            emissive_intensity: self.emissive_intensity * tuning.emissive_intensity as f32,
            env_map_intensity: self.env_map_intensity * tuning.env_map_intensity as f32,
            ..self.clone()
        }
    }

    /// 由粗糙度换算的 Blinn-Phong 指数
    pub fn shininess(&self) -> f32 {
        let r = self.roughness.clamp(0.04, 1.0);
        (2.0 / (r * r * r * r) - 2.0).max(1.0)
    }
}
