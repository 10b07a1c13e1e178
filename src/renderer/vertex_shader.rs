use crate::vertex::{ClipSpaceVertex, Triangle};
use cgmath::{InnerSpace, Matrix, Matrix4 as Mat4, SquareMatrix, Vector3 as Vec3};

/// 同一网格实例所有顶点共享的矩阵
pub struct VertexUniforms {
    pub model: Mat4<f32>,
    pub mvp: Mat4<f32>,
    pub normal: Mat4<f32>,
}

impl VertexUniforms {
    /// 模型矩阵不可逆（缩放为零）时，法线矩阵直接使用模型矩阵
    pub fn new(model: Mat4<f32>, view_proj: Mat4<f32>) -> Self {
        Self {
            model,
            mvp: view_proj * model,
            normal: model.invert().map_or(model, |m| m.transpose()),
        }
    }

    pub fn world_normal(&self, normal: Vec3<f32>) -> Vec3<f32> {
        (self.normal * normal.extend(0.0)).truncate()
    }

    pub fn world_position(&self, pos: Vec3<f32>) -> Vec3<f32> {
        (self.model * pos.extend(1.0)).truncate()
    }
}

pub trait VertexShader: Sync {
    // 模型空间三角形 -> 裁剪空间三角形
    fn shade_triangle(&self, triangle: &Triangle, uniforms: &VertexUniforms) -> [ClipSpaceVertex; 3];
}

pub struct DefaultVertexShader;

impl VertexShader for DefaultVertexShader {
    fn shade_triangle(&self, triangle: &Triangle, uniforms: &VertexUniforms) -> [ClipSpaceVertex; 3] {
        triangle.vertices.map(|v| {
            let normal = uniforms.world_normal(v.normal);
            ClipSpaceVertex {
                position: uniforms.mvp * v.pos.extend(1.0),
                world_pos: uniforms.world_position(v.pos),
                normal: if normal.magnitude2() > 0.0 { normal.normalize() } else { normal },
                uv: v.uv,
            }
        })
    }
}
