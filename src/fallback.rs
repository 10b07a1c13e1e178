//! 主模型不可用时使用的内置方块机器人

use cgmath::Vector3 as Vec3;

use crate::animation::Trs;
use crate::color::Color;
use crate::material::Material;
use crate::model::{AvatarModel, Mesh, ROOT};
use crate::vertex::Triangle;

const BODY: u32 = 0x5a9fd4;
const HEAD: u32 = 0x7bb8e8;
const EYE_GLOW: u32 = 0x00ff88;

/// 以原点为中心的轴对齐长方体，12 个朝外的三角形
pub fn box_triangles(size: [f32; 3]) -> Vec<Triangle> {
    let [hx, hy, hz] = size.map(|s| s * 0.5);
    let p = |x: f32, y: f32, z: f32| Vec3::new(x * hx, y * hy, z * hz);
    // 每个面：从外侧看逆时针的四个角
    let faces = [
        [p(1., -1., -1.), p(1., 1., -1.), p(1., 1., 1.), p(1., -1., 1.)],
        [p(-1., -1., 1.), p(-1., 1., 1.), p(-1., 1., -1.), p(-1., -1., -1.)],
        [p(-1., 1., -1.), p(-1., 1., 1.), p(1., 1., 1.), p(1., 1., -1.)],
        [p(-1., -1., 1.), p(-1., -1., -1.), p(1., -1., -1.), p(1., -1., 1.)],
        [p(-1., -1., 1.), p(1., -1., 1.), p(1., 1., 1.), p(-1., 1., 1.)],
        [p(1., -1., -1.), p(-1., -1., -1.), p(-1., 1., -1.), p(1., 1., -1.)],
    ];
    faces
        .iter()
        .flat_map(|[a, b, c, d]| [Triangle::flat(*a, *b, *c), Triangle::flat(*c, *d, *a)])
        .collect()
}

/// 备用模型：身体、头部、两只发光的眼睛和两条手臂
pub fn metabot() -> AvatarModel {
    let mut model = AvatarModel::new("metabot");
    let body = model.add_material(Material::standard("body", Color::from_hex(BODY), 0.6, 0.2));
    let head = model.add_material(Material::standard("head", Color::from_hex(HEAD), 0.6, 0.2));
    let eye = model.add_material(
        Material::standard("eye", Color::WHITE, 0.0, 1.0).with_emissive(Color::from_hex(EYE_GLOW), 0.8),
    );

    let parts: [(&str, [f32; 3], [f32; 3], usize); 6] = [
        ("body", [1.5, 2.0, 1.0], [0.0, 0.0, 0.0], body),
        ("head", [1.0, 1.0, 0.8], [0.0, 1.5, 0.0], head),
        ("eye_left", [0.2, 0.2, 0.1], [-0.3, 1.5, 0.5], eye),
        ("eye_right", [0.2, 0.2, 0.1], [0.3, 1.5, 0.5], eye),
        ("arm_left", [0.3, 1.5, 0.3], [-1.0, 0.0, 0.0], body),
        ("arm_right", [0.3, 1.5, 0.3], [1.0, 0.0, 0.0], body),
    ];
    for (name, size, offset, material) in parts {
        let node = model.add_node(name, ROOT, Trs::from_translation(Vec3::from(offset)));
        model.attach_mesh(
            node,
            Mesh {
                triangles: box_triangles(size),
                material,
            },
        );
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn box_faces_point_outwards() {
        for tri in box_triangles([2.0, 4.0, 6.0]) {
            let outward = tri.get_center().normalize();
            assert!(tri.normal.dot(outward) > 0.0, "{:?}", tri.normal);
        }
    }

    #[test]
    fn box_has_requested_extent() {
        let tris = box_triangles([1.5, 2.0, 1.0]);
        assert_eq!(tris.len(), 12);
        let max_y = tris
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| v.pos.y))
            .fold(f32::MIN, f32::max);
        assert!((max_y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn metabot_has_six_parts_under_root() {
        let model = metabot();
        assert_eq!(model.nodes.len(), 7);
        assert!(model.nodes[1..].iter().all(|n| n.parent == Some(ROOT)));
        assert_eq!(model.triangle_count(), 72);
        let (min, max) = model.bounds().unwrap();
        assert!((max.y - 2.0).abs() < 1e-5);
        assert!((min.x + 1.15).abs() < 1e-5);
        assert!(model.materials[2].emissive_intensity > 0.0);
    }
}
