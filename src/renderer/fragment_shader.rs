use cgmath::{ElementWise, InnerSpace, Vector2 as Vec2, Vector3 as Vec3, Zero};

use crate::lighting::ShadeLight;
use crate::material::Material;

#[derive(Debug)]
pub struct FragmentData<'a> {
    pub world_pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub uv: Vec2<f32>,
    pub material: &'a Material,
    pub camera_pos: Vec3<f32>,
}

// 定义 Shader 的通用行为
pub trait FragmentShader: Sync {
    // 输入插值后的片元数据，输出线性空间的辐射度（未经色调映射）
    fn shade(&self, data: FragmentData) -> Vec3<f32>;
}

/// 环境预设的天空/地面色调（线性颜色）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentLight {
    pub sky: Vec3<f32>,
    pub ground: Vec3<f32>,
}

impl EnvironmentLight {
    fn sample(&self, dir: Vec3<f32>) -> Vec3<f32> {
        let t = (dir.y * 0.5 + 0.5).clamp(0.0, 1.0);
        self.ground + (self.sky - self.ground) * t
    }
}

/// 对灯光组中每个灯光计算 Lambert 漫反射 + Blinn-Phong 高光
pub struct StandardShader {
    pub lights: Vec<ShadeLight>,
    pub environment: Option<EnvironmentLight>,
}

/// 非金属的镜面反射率
const DIELECTRIC_F0: f32 = 0.04;

fn falloff(distance_to_light: f32, range: f32) -> f32 {
    if range <= 0.0 {
        return 1.0;
    }
    let k = (1.0 - distance_to_light / range).clamp(0.0, 1.0);
    k * k
}

impl FragmentShader for StandardShader {
    fn shade(&self, data: FragmentData) -> Vec3<f32> {
        let material = data.material;
        let n = if data.normal.magnitude2() > 0.0 {
            data.normal.normalize()
        } else {
            Vec3::unit_y()
        };
        let view_dir = (data.camera_pos - data.world_pos).normalize();

        let albedo = material.base_color * (1.0 - material.metalness);
        let f0 = Vec3::new(DIELECTRIC_F0, DIELECTRIC_F0, DIELECTRIC_F0);
        let specular_color = f0 + (material.base_color - f0) * material.metalness;
        let shininess = material.shininess();

        let direct = |light_dir: Vec3<f32>, radiance: Vec3<f32>| -> Vec3<f32> {
            let n_dot_l = n.dot(light_dir);
            if n_dot_l <= 0.0 {
                return Vec3::zero();
            }
            let half_dir = (light_dir + view_dir).normalize();
            let spec = n.dot(half_dir).max(0.0).powf(shininess);
            let diffuse = albedo * n_dot_l;
            let specular = specular_color * spec;
            radiance.mul_element_wise(diffuse + specular)
        };

        let mut color = Vec3::zero();
        for light in &self.lights {
            color += match *light {
                ShadeLight::Hemisphere { sky, ground } => {
                    let t = n.y * 0.5 + 0.5;
                    (ground + (sky - ground) * t).mul_element_wise(albedo)
                }
                ShadeLight::Ambient(radiance) => radiance.mul_element_wise(albedo),
                ShadeLight::Point {
                    position,
                    radiance,
                    distance,
                } => {
                    let to_light = position - data.world_pos;
                    let d = to_light.magnitude();
                    if d <= f32::EPSILON {
                        Vec3::zero()
                    } else {
                        direct(to_light / d, radiance * falloff(d, distance))
                    }
                }
                ShadeLight::Directional { direction, radiance } => direct(-direction, radiance),
            };
        }

        if let Some(env) = &self.environment {
            let reflected = n * (2.0 * n.dot(view_dir)) - view_dir;
            let diffuse = env.sample(n).mul_element_wise(albedo);
            let specular = env
                .sample(reflected)
                .mul_element_wise(specular_color)
                * (1.0 - material.roughness);
            color += (diffuse + specular) * material.env_map_intensity;
        }

        color + material.emissive * material.emissive_intensity
    }
}
