pub mod clip;
pub mod fragment_shader;
pub mod post_effect;
pub mod vertex_shader;

use cgmath::{InnerSpace, Matrix4 as Mat4, SquareMatrix, Vector2 as Vec2, Vector3 as Vec3};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::framebuffer::FrameBuffer;
use crate::lighting::ShadowPlane;
use crate::material::Material;
use crate::rasterizer;
use crate::vertex::{ClipSpaceVertex, RasterPoint, RasterTriangle, Triangle};

use self::clip::{Clipper, NearClipper};
use self::fragment_shader::{FragmentData, FragmentShader};
use self::post_effect::ToneMapper;
use self::vertex_shader::{DefaultVertexShader, VertexShader, VertexUniforms};

pub const BACKGROUND: u32 = 0xFFF5F7FA;

pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// 一个网格实例：模型空间三角形、世界矩阵和材质
pub struct DrawCall<'a> {
    pub triangles: &'a [Triangle],
    pub model: Mat4<f32>,
    pub material: &'a Material,
    pub tag: u32,
}

pub struct Renderer {
    pub(crate) framebuffer: FrameBuffer,
    viewport: Viewport,
    pub tone: ToneMapper,
}

impl Renderer {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            framebuffer: FrameBuffer::new(w, h),
            viewport: Viewport {
                x: 0,
                y: 0,
                w: w as i32,
                h: h as i32,
            },
            tone: ToneMapper::default(),
        }
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn clear(&mut self) {
        self.framebuffer.clear(BACKGROUND);
    }

    pub fn draw(&mut self, camera: &Camera, shader: &dyn FragmentShader, call: &DrawCall) {
        let raster = self.vertex_stage(camera, call.triangles, &call.model, true);
        for triangle in &raster {
            self.rasterize_triangle(triangle, camera.eye, call.material, call.tag, shader);
        }
    }

    /// 标记 `triangles` 沿 `direction` 投影后覆盖的平面像素
    pub fn draw_shadow(
        &mut self,
        camera: &Camera,
        triangles: &[Triangle],
        model: &Mat4<f32>,
        plane: &ShadowPlane,
        direction: Vec3<f32>,
    ) {
        let Some(projection) = planar_shadow_matrix(plane, direction) else {
            return;
        };
        let raster = self.vertex_stage(camera, triangles, &(projection * model), false);
        let (width, height) = (self.framebuffer.width, self.framebuffer.height);
        for triangle in &raster {
            let points = &triangle.vertices;
            let screen = points.map(|p| p.pos);
            rasterizer::for_each_covered_pixel(&screen, width, height, |x, y, bary| {
                let depth = rasterizer::interpolate_depth(points, bary);
                self.framebuffer.mark_shadow(x, y, depth);
            });
        }
    }

    pub fn resolve_shadows(&mut self, opacity: f32) {
        self.framebuffer.resolve_shadows(opacity);
    }

    // 管线阶段 1-4：背面剔除、顶点着色、裁剪、屏幕映射（并行）
    fn vertex_stage(
        &self,
        camera: &Camera,
        triangles: &[Triangle],
        model: &Mat4<f32>,
        cull_back_faces: bool,
    ) -> Vec<RasterTriangle> {
        let uniforms = VertexUniforms::new(*model, camera.get_view_proj_mat());
        let eye = camera.eye;

        triangles
            .par_iter()
            .filter(|triangle| {
                if !cull_back_faces {
                    return true;
                }
                let world_pos = uniforms.world_position(triangle.vertices[0].pos);
                (eye - world_pos).dot(uniforms.world_normal(triangle.normal)) > 0.0
            })
            .flat_map_iter(|triangle| {
                let clip_space = DefaultVertexShader.shade_triangle(triangle, &uniforms);
                NearClipper.clip_triangle(&clip_space)
            })
            .map(|clipped| self.viewport_transform(&clipped))
            .collect()
    }

    //视口变换
    fn viewport_transform(&self, clip_triangle: &[ClipSpaceVertex; 3]) -> RasterTriangle {
        let raster_vertices = clip_triangle.map(|clip_v| {
            let inv_w = 1.0 / clip_v.position.w;
            // 透视除法
            let ndc_pos = clip_v.position * inv_w;

            // 转换到屏幕空间
            let screen_x = (ndc_pos.x + 1.0) * 0.5 * self.viewport.w as f32 + self.viewport.x as f32;
            let screen_y = self.viewport.h as f32 - (ndc_pos.y + 1.0) * 0.5 * self.viewport.h as f32
                + self.viewport.y as f32;

            RasterPoint {
                pos: Vec2::new(screen_x, screen_y),
                z: (ndc_pos.z + 1.0) * 0.5,
                inv_w,
                world_pos: clip_v.world_pos,
                normal: clip_v.normal,
                uv: clip_v.uv,
            }
        });

        RasterTriangle {
            vertices: raster_vertices,
        }
    }

    // 管线阶段 5：光栅化和像素着色
    fn rasterize_triangle(
        &mut self,
        triangle: &RasterTriangle,
        camera_pos: Vec3<f32>,
        material: &Material,
        tag: u32,
        shader: &dyn FragmentShader,
    ) {
        let points = &triangle.vertices;
        let screen = points.map(|p| p.pos);
        let (width, height) = (self.framebuffer.width, self.framebuffer.height);
        let tone = self.tone;
        let framebuffer = &mut self.framebuffer;

        rasterizer::for_each_covered_pixel(&screen, width, height, |x, y, bary| {
            let depth = rasterizer::interpolate_depth(points, bary);
            if !(0.0..=1.0).contains(&depth) || !framebuffer.passes_depth(x, y, depth) {
                return;
            }
            let weights = rasterizer::perspective_weights(points, bary);
            let fragment = FragmentData {
                world_pos: rasterizer::interpolate(points.map(|p| p.world_pos), weights),
                normal: rasterizer::interpolate(points.map(|p| p.normal), weights),
                uv: rasterizer::interpolate(points.map(|p| p.uv), weights),
                material,
                camera_pos,
            };
            let color = tone.encode(shader.shade(fragment));
            framebuffer.put_pixel(x, y, color, depth, tag);
        });
    }
}

/// 把世界坐标点沿 `direction` 投影到 `plane` 上；
/// 光线照不到平面上侧时返回 `None`
pub fn planar_shadow_matrix(plane: &ShadowPlane, direction: Vec3<f32>) -> Option<Mat4<f32>> {
    let n = plane.normal;
    let along = -direction.dot(n);
    if along <= 1e-4 {
        return None;
    }
    let p = n.extend(-n.dot(plane.position));
    let l = (-direction).extend(0.0);
    let id = Mat4::identity();
    Some(Mat4::from_cols(
        id.x - l * (p.x / along),
        id.y - l * (p.y / along),
        id.z - l * (p.z / along),
        id.w - l * (p.w / along),
    ))
}
