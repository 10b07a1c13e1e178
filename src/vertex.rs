use cgmath::{InnerSpace, Matrix4 as Mat4, Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4, Zero};

/// 模型空间顶点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub uv: Vec2<f32>,
}

impl Vertex {
    pub fn new(pos: Vec3<f32>, normal: Vec3<f32>) -> Self {
        Self {
            pos,
            normal,
            uv: Vec2::zero(),
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            pos: Vec3::zero(),
            normal: Vec3::new(0.0, 1.0, 0.0),
            uv: Vec2::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    /// 面法线，用于背面剔除
    pub normal: Vec3<f32>,
}

impl Triangle {
    fn compute_normal(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> Vec3<f32> {
        let edge1 = v1.pos - v0.pos;
        let edge2 = v2.pos - v0.pos;
        let n = edge1.cross(edge2);
        if n.magnitude2() > 0.0 { n.normalize() } else { Vec3::zero() }
    }

    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            normal: Self::compute_normal(&v0, &v1, &v2),
            vertices: [v0, v1, v2],
        }
    }

    /// 平直着色三角形：每个顶点都使用面法线
    pub fn flat(p0: Vec3<f32>, p1: Vec3<f32>, p2: Vec3<f32>) -> Self {
        let mut tri = Self::new(
            Vertex::new(p0, Vec3::zero()),
            Vertex::new(p1, Vec3::zero()),
            Vertex::new(p2, Vec3::zero()),
        );
        for v in &mut tri.vertices {
            v.normal = tri.normal;
        }
        tri
    }

    pub fn get_center(&self) -> Vec3<f32> {
        (self.vertices[0].pos + self.vertices[1].pos + self.vertices[2].pos) / 3.0
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal == Vec3::zero()
    }

    pub fn transformed_positions(&self, model: &Mat4<f32>) -> [Vec3<f32>; 3] {
        self.vertices.map(|v| (*model * v.pos.extend(1.0)).truncate())
    }
}

/// 裁剪空间顶点（顶点着色器输出）
#[derive(Debug, Clone, Copy)]
pub struct ClipSpaceVertex {
    pub position: Vec4<f32>,
    pub world_pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub uv: Vec2<f32>,
}

impl ClipSpaceVertex {
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position + (other.position - self.position) * t,
            world_pos: self.world_pos + (other.world_pos - self.world_pos) * t,
            normal: self.normal + (other.normal - self.normal) * t,
            uv: self.uv + (other.uv - self.uv) * t,
        }
    }
}

/// 光栅化阶段的屏幕空间点
#[derive(Debug, Clone, Copy)]
pub struct RasterPoint {
    pub pos: Vec2<f32>,
    pub z: f32,
    /// 1/w，用于透视校正插值
    pub inv_w: f32,
    pub world_pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub uv: Vec2<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct RasterTriangle {
    pub vertices: [RasterPoint; 3],
}
