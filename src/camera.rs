use cgmath::{EuclideanSpace, InnerSpace, Matrix4 as Mat4, Point3, Vector3 as Vec3};

use crate::config::{CameraSettings, degrees_to_radians, vec3_to_f32};

pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 100.0;

#[derive(Debug, Clone)]
pub struct Frustum {
    near: f32,
    aspect: f32,
    fovy: f32,
    far: f32,
    mat: Mat4<f32>,
}

impl Frustum {
    #[rustfmt::skip]
    pub fn new(near: f32, aspect: f32, far: f32, fovy: f32) -> Self {
        let tan_half_fovy = (fovy / 2.0).tan();
        let a = 1.0 / (aspect * tan_half_fovy);
        let b = 1.0 / tan_half_fovy;
        let c = -(far + near) / (far - near);
        let d = -2.0 * far * near / (far - near);

        // 投影
        let mat = Mat4::new(
            a,    0.0,   0.0,   0.0,
            0.0,  b,     0.0,   0.0,
            0.0,  0.0,   c,    -1.0,
            0.0,  0.0,   d,     0.0,
        );

        Self {
            near,
            aspect,
            fovy,
            far,
            mat,
        }
    }

    pub fn get_mat(&self) -> &Mat4<f32> {
        &self.mat
    }

    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn depth_range(&self) -> (f32, f32) {
        (self.near, self.far)
    }
}

/// 看向 `target` 的透视相机
#[derive(Debug, Clone)]
pub struct Camera {
    frustum: Frustum,
    pub eye: Vec3<f32>,
    pub target: Vec3<f32>,
    pub up: Vec3<f32>,
}

impl Camera {
    pub fn new(fovy: f32, aspect: f32) -> Self {
        Self {
            frustum: Frustum::new(NEAR, aspect, FAR, fovy),
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::new(0.0, 0.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
        }
    }

    /// fov 以角度给出
    pub fn from_settings(settings: &CameraSettings, aspect: f32) -> Self {
        let mut camera = Self::new(degrees_to_radians(settings.fov) as f32, aspect);
        camera.eye = vec3_to_f32(settings.position);
        camera
    }

    pub fn get_frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.frustum = Frustum::new(NEAR, aspect, FAR, self.frustum.fovy);
    }

    pub fn get_view_mat(&self) -> Mat4<f32> {
        Mat4::look_at_rh(
            Point3::from_vec(self.eye),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    pub fn get_view_proj_mat(&self) -> Mat4<f32> {
        self.frustum.get_mat() * self.get_view_mat()
    }
}

const POLAR_EPS: f32 = 1e-6;
const MIN_RADIUS: f32 = 0.5;
const MAX_RADIUS: f32 = 50.0;
const ZOOM_STEP: f32 = 0.95;

/// 轨道式视角控制：视点位于以 `target` 为中心的球面上
///
/// 极角从 +Y 轴量起，方位角从 +Z 转向 +X
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3<f32>,
    radius: f32,
    azimuth: f32,
    polar: f32,
    min_polar: f32,
    max_polar: f32,
    enable_zoom: bool,
    enable_pan: bool,
}

impl OrbitControls {
    pub fn from_settings(settings: &CameraSettings) -> Self {
        let target = Vec3::new(0.0, 0.0, 0.0);
        let offset = vec3_to_f32(settings.position) - target;
        let radius = offset.magnitude().max(POLAR_EPS);
        let controls = &settings.controls;
        let mut orbit = Self {
            target,
            radius,
            azimuth: offset.x.atan2(offset.z),
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            min_polar: degrees_to_radians(controls.min_polar_angle) as f32,
            max_polar: degrees_to_radians(controls.max_polar_angle) as f32,
            enable_zoom: controls.enable_zoom,
            enable_pan: controls.enable_pan,
        };
        orbit.polar = orbit.clamp_polar(orbit.polar);
        orbit
    }

    fn clamp_polar(&self, polar: f32) -> f32 {
        // 范围颠倒时以下限为准
        polar
            .min(self.max_polar)
            .max(self.min_polar)
            .clamp(POLAR_EPS, std::f32::consts::PI - POLAR_EPS)
    }

    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn rotate(&mut self, d_azimuth: f32, d_polar: f32) {
        self.azimuth += d_azimuth;
        self.polar = self.clamp_polar(self.polar + d_polar);
    }

    /// 指针拖动（像素）；拖过整个视口高度转一整圈
    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let per_pixel = std::f32::consts::TAU / viewport_height.max(1.0);
        self.rotate(-dx * per_pixel, -dy * per_pixel);
    }

    /// 正的步数拉近视点，返回是否有变化
    pub fn zoom(&mut self, steps: f32) -> bool {
        if !self.enable_zoom || steps == 0.0 {
            return false;
        }
        self.radius = (self.radius * ZOOM_STEP.powf(steps)).clamp(MIN_RADIUS, MAX_RADIUS);
        true
    }

    /// 屏幕空间平移（像素），缩放使目标平面跟随指针
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32, fovy: f32) -> bool {
        if !self.enable_pan {
            return false;
        }
        let forward = (self.target - self.eye()).normalize();
        let right = forward.cross(Vec3::unit_y());
        if right.magnitude2() == 0.0 {
            return false;
        }
        let right = right.normalize();
        let up = right.cross(forward);
        let target_distance = self.radius * (fovy / 2.0).tan();
        let scale = 2.0 * target_distance / viewport_height.max(1.0);
        self.target += up * (dy * scale) - right * (dx * scale);
        true
    }

    pub fn eye(&self) -> Vec3<f32> {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        self.target + Vec3::new(sin_p * sin_a, cos_p, sin_p * cos_a) * self.radius
    }

    pub fn apply(&self, camera: &mut Camera) {
        camera.eye = self.eye();
        camera.target = self.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    fn close(a: Vec3<f32>, b: Vec3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn default_orbit_reproduces_configured_position() {
        let settings = ModelConfig::default().camera;
        let orbit = OrbitControls::from_settings(&settings);
        assert!(close(orbit.eye(), Vec3::new(0.0, 1.0, 6.0)));
        let mut camera = Camera::from_settings(&settings, 4.0 / 3.0);
        orbit.apply(&mut camera);
        assert!(close(camera.eye, Vec3::new(0.0, 1.0, 6.0)));
        assert!((camera.get_frustum().fovy() - 45f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn polar_angle_is_clamped_to_configured_range() {
        let settings = ModelConfig::default().camera;
        let mut orbit = OrbitControls::from_settings(&settings);
        orbit.rotate(0.0, -2.0);
        assert!((orbit.polar() - 60f32.to_radians()).abs() < 1e-5);
        orbit.rotate(0.0, 3.0);
        assert!((orbit.polar() - 90f32.to_radians()).abs() < 1e-5);
        // 90 度时视点与目标等高
        assert!(orbit.eye().y.abs() < 1e-4);
    }

    #[test]
    fn azimuth_is_unbounded() {
        let mut orbit = OrbitControls::from_settings(&ModelConfig::default().camera);
        let before = orbit.eye();
        orbit.rotate(std::f32::consts::PI, 0.0);
        let after = orbit.eye();
        assert!((after.x + before.x).abs() < 1e-4);
        assert!((after.z + before.z).abs() < 1e-4);
        assert!((after.y - before.y).abs() < 1e-4);
    }

    #[test]
    fn zoom_and_pan_respect_flags() {
        let mut settings = ModelConfig::default().camera;
        let mut orbit = OrbitControls::from_settings(&settings);
        let radius = orbit.radius();
        assert!(!orbit.zoom(3.0));
        assert!(!orbit.pan(10.0, 10.0, 600.0, 0.8));
        assert_eq!(orbit.radius(), radius);

        settings.controls.enable_zoom = true;
        settings.controls.enable_pan = true;
        let mut orbit = OrbitControls::from_settings(&settings);
        assert!(orbit.zoom(3.0));
        assert!(orbit.radius() < radius);
        assert!(orbit.pan(0.0, 100.0, 600.0, 0.8));
        assert!(orbit.target.y > 0.0);
    }

    #[test]
    fn zoom_stays_within_limits() {
        let mut settings = ModelConfig::default().camera;
        settings.controls.enable_zoom = true;
        let mut orbit = OrbitControls::from_settings(&settings);
        orbit.zoom(1000.0);
        assert_eq!(orbit.radius(), MIN_RADIUS);
        orbit.zoom(-1000.0);
        assert_eq!(orbit.radius(), MAX_RADIUS);
    }
}
