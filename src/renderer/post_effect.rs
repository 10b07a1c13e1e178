use cgmath::Vector3 as Vec3;

use crate::config::{RenderingSettings, ToneMappingMode};

/// 逐片元的曝光、色调映射和 sRGB 编码
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapper {
    pub mode: ToneMappingMode,
    pub exposure: f32,
}

impl Default for ToneMapper {
    /// 没有 `rendering` 配置时只做截断，不使用曲线
    fn default() -> Self {
        Self {
            mode: ToneMappingMode::None,
            exposure: 1.0,
        }
    }
}

impl ToneMapper {
    pub fn from_settings(settings: Option<&RenderingSettings>) -> Self {
        settings.map_or_else(Self::default, |r| Self {
            mode: r.tone_mapping,
            exposure: r.exposure as f32,
        })
    }

    pub fn map_channel(&self, c: f32) -> f32 {
        let c = c.max(0.0);
        let mapped = match self.mode {
            ToneMappingMode::None => c,
            ToneMappingMode::Linear => c * self.exposure,
            ToneMappingMode::Reinhard => {
                let x = c * self.exposure;
                x / (1.0 + x)
            }
            ToneMappingMode::Aces => {
                // Narkowicz 拟合
                let x = c * self.exposure;
                (x * (2.51 * x + 0.03)) / (x * (2.43 * x + 0.59) + 0.14)
            }
        };
        mapped.clamp(0.0, 1.0)
    }

    /// 线性辐射度转换为不透明的 ARGB 像素
    pub fn encode(&self, color: Vec3<f32>) -> u32 {
        let to_byte = |c: f32| (linear_to_srgb(self.map_channel(c)) * 255.0).round() as u32;
        0xFF000000 | to_byte(color.x) << 16 | to_byte(color.y) << 8 | to_byte(color.z)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}
