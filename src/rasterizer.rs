use std::ops::{Add, Mul};

use cgmath::{Vector2 as Vec2, dot};

use crate::vertex::RasterPoint;

pub fn get_barycentric_coords(
    vertices: &[Vec2<f32>; 3],
    p: &Vec2<f32>,
) -> Option<(f32, f32, f32)> {
    let v0 = vertices[1] - vertices[0];
    let v1 = vertices[2] - vertices[0];
    let v2 = *p - vertices[0];

    let d00 = dot(v0, v0);
    let d01 = dot(v0, v1);
    let d11 = dot(v1, v1);
    let d20 = dot(v2, v0);
    let d21 = dot(v2, v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-6 {
        return None; // 三角形面积为零，无法计算重心坐标
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;

    Some((u, v, w))
}

/// 屏幕空间（仿射）插值，`u` 对应第一个顶点
pub fn interpolate_depth(points: &[RasterPoint; 3], bary: (f32, f32, f32)) -> f32 {
    let (u, v, w) = bary;
    points[0].z * u + points[1].z * v + points[2].z * w
}

/// 由屏幕空间重心坐标得到透视校正权重
pub fn perspective_weights(points: &[RasterPoint; 3], bary: (f32, f32, f32)) -> (f32, f32, f32) {
    let (u, v, w) = bary;
    let (a, b, c) = (u * points[0].inv_w, v * points[1].inv_w, w * points[2].inv_w);
    let sum = a + b + c;
    if sum.abs() < f32::EPSILON {
        return bary;
    }
    (a / sum, b / sum, c / sum)
}

pub fn interpolate<T>(values: [T; 3], weights: (f32, f32, f32)) -> T
where
    T: Mul<f32, Output = T> + Add<Output = T>,
{
    let [a, b, c] = values;
    a * weights.0 + b * weights.1 + c * weights.2
}

/// 三角形的像素包围盒，裁剪到 `width` × `height` 范围内
pub fn get_box(vertices: &[Vec2<f32>; 3], width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
    let min_x = vertices.iter().map(|v| v.x).fold(f32::INFINITY, f32::min);
    let max_x = vertices.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = vertices.iter().map(|v| v.y).fold(f32::INFINITY, f32::min);
    let max_y = vertices.iter().map(|v| v.y).fold(f32::NEG_INFINITY, f32::max);

    if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_x < 0.0 || max_y < 0.0 || min_x >= width as f32 || min_y >= height as f32 {
        return None;
    }
    Some((
        min_x.floor().max(0.0) as usize,
        min_y.floor().max(0.0) as usize,
        (max_x.ceil() as usize).min(width.saturating_sub(1)),
        (max_y.ceil() as usize).min(height.saturating_sub(1)),
    ))
}

pub fn is_inside_triangle(vertices: &[Vec2<f32>; 3], p: &Vec2<f32>) -> bool {
    let v0 = vertices[1] - vertices[0];
    let v1 = vertices[2] - vertices[1];
    let v2 = vertices[0] - vertices[2];

    let p0 = *p - vertices[0];
    let p1 = *p - vertices[1];
    let p2 = *p - vertices[2];

    let cross0 = v0.x * p0.y - v0.y * p0.x;
    let cross1 = v1.x * p1.y - v1.y * p1.x;
    let cross2 = v2.x * p2.y - v2.y * p2.x;

    (cross0 >= 0.0 && cross1 >= 0.0 && cross2 >= 0.0)
        || (cross0 <= 0.0 && cross1 <= 0.0 && cross2 <= 0.0)
}

/// 对三角形覆盖的每个像素中心调用 `f(x, y, bary)`
pub fn for_each_covered_pixel(
    screen: &[Vec2<f32>; 3],
    width: usize,
    height: usize,
    mut f: impl FnMut(usize, usize, (f32, f32, f32)),
) {
    let Some((min_x, min_y, max_x, max_y)) = get_box(screen, width, height) else {
        return;
    };
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if !is_inside_triangle(screen, &p) {
                continue;
            }
            if let Some(bary) = get_barycentric_coords(screen, &p) {
                f(x, y, bary);
            }
        }
    }
}
