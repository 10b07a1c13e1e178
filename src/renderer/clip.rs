use crate::vertex::ClipSpaceVertex;

pub trait Clipper {
    // 接收一个裁剪空间的三角形
    // 返回裁剪后产生的零个、一个或两个三角形
    fn clip_triangle(&self, triangle: &[ClipSpaceVertex; 3]) -> Vec<[ClipSpaceVertex; 3]>;
}

/// 近平面裁剪（裁剪空间中 `z >= -w`）
pub struct NearClipper;

fn near_distance(v: &ClipSpaceVertex) -> f32 {
    v.position.z + v.position.w
}

impl Clipper for NearClipper {
    fn clip_triangle(&self, triangle: &[ClipSpaceVertex; 3]) -> Vec<[ClipSpaceVertex; 3]> {
        let d = triangle.each_ref().map(near_distance);
        if d.iter().all(|&x| x >= 0.0) {
            return vec![*triangle];
        }
        if d.iter().all(|&x| x < 0.0) {
            return vec![];
        }

        // Sutherland-Hodgman 单平面裁剪，结果最多四个顶点
        let mut polygon: Vec<ClipSpaceVertex> = Vec::with_capacity(4);
        for i in 0..3 {
            let j = (i + 1) % 3;
            let (a, b) = (&triangle[i], &triangle[j]);
            if d[i] >= 0.0 {
                polygon.push(*a);
            }
            if (d[i] >= 0.0) != (d[j] >= 0.0) {
                let t = d[i] / (d[i] - d[j]);
                polygon.push(a.lerp(b, t));
            }
        }
        (1..polygon.len().saturating_sub(1))
            .map(|k| [polygon[0], polygon[k], polygon[k + 1]])
            .collect()
    }
}
