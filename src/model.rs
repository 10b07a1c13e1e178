use std::io::Cursor;

use cgmath::{InnerSpace, Matrix4 as Mat4, SquareMatrix, Vector2 as Vec2, Vector3 as Vec3, Zero};

use crate::animation::{Clip, Trs};
use crate::config::MaterialTuning;
use crate::error::AssetError;
use crate::material::Material;
use crate::vertex::{Triangle, Vertex};

/// 资源场景根节点在 [`AvatarModel::nodes`] 中的索引
pub const ROOT: usize = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
    pub material: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    pub rest: Trs,
    pub meshes: Vec<usize>,
}

/// 带网格、材质和动画片段的节点层级
///
/// 父节点总在子节点之前，因此一次正向遍历即可
/// 得到所有世界矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarModel {
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub clips: Vec<Clip>,
}

impl AvatarModel {
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                name: root_name.to_string(),
                parent: None,
                rest: Trs::default(),
                meshes: Vec::new(),
            }],
            meshes: Vec::new(),
            materials: Vec::new(),
            clips: Vec::new(),
        }
    }

    pub fn add_node(&mut self, name: &str, parent: usize, rest: Trs) -> usize {
        self.nodes.push(Node {
            name: name.to_string(),
            parent: Some(parent),
            rest,
            meshes: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn attach_mesh(&mut self, node: usize, mesh: Mesh) {
        self.meshes.push(mesh);
        let index = self.meshes.len() - 1;
        self.nodes[node].meshes.push(index);
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }

    pub fn rest_pose(&self) -> Vec<Trs> {
        self.nodes.iter().map(|n| n.rest).collect()
    }

    /// `pose` 下每个节点的世界矩阵
    pub fn world_matrices(&self, pose: &[Trs]) -> Vec<Mat4<f32>> {
        let mut world: Vec<Mat4<f32>> = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let local = pose.get(i).unwrap_or(&node.rest).matrix();
            let m = match node.parent {
                Some(p) if p < world.len() => world[p] * local,
                _ => local,
            };
            world.push(m);
        }
        world
    }

    pub fn material(&self, index: usize) -> &Material {
        static FALLBACK: std::sync::OnceLock<Material> = std::sync::OnceLock::new();
        self.materials
            .get(index)
            .unwrap_or_else(|| FALLBACK.get_or_init(Material::default))
    }

    pub fn apply_tuning(&mut self, tuning: &MaterialTuning) {
        for material in &mut self.materials {
            *material = material.tuned(tuning);
        }
    }

    /// 静止姿态的轴对齐包围盒（根节点空间）
    pub fn bounds(&self) -> Option<(Vec3<f32>, Vec3<f32>)> {
        let mut world = self.world_matrices(&self.rest_pose());
        // 包围盒相对于根节点自身的变换
        if let Some(inv) = world[ROOT].invert() {
            for m in &mut world {
                *m = inv * *m;
            }
        }
        let mut min = Vec3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vec3::new(f32::MIN, f32::MIN, f32::MIN);
        let mut any = false;
        for (node, m) in self.nodes.iter().zip(&world) {
            for &mesh in &node.meshes {
                for tri in &self.meshes[mesh].triangles {
                    for p in tri.transformed_positions(m) {
                        min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
                        max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
                        any = true;
                    }
                }
            }
        }
        any.then_some((min, max))
    }
}

/// 从 OBJ 数据构建模型；缺少法线时按相邻面平均计算顶点法线
pub fn load_obj(name: &str, bytes: &[u8]) -> Result<AvatarModel, AssetError> {
    let (models, _materials) = tobj::load_obj_buf(
        &mut Cursor::new(bytes),
        &tobj::GPU_LOAD_OPTIONS,
        |_| Err(tobj::LoadError::OpenFileFailed),
    )?;

    let mut avatar = AvatarModel::new(name);
    let material = avatar.add_material(Material::default());

    for model in models {
        let mesh = &model.mesh;
        let positions: Vec<Vec3<f32>> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect();
        let uvs: Vec<Vec2<f32>> = mesh
            .texcoords
            .chunks_exact(2)
            .map(|t| Vec2::new(t[0], t[1]))
            .collect();

        let normals: Vec<Vec3<f32>> = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| Vec3::new(n[0], n[1], n[2]))
                .collect()
        } else {
            // 计算每个顶点的法线（平均相邻面的法线）
            let mut acc = vec![Vec3::zero(); positions.len()];
            for face in mesh.indices.chunks_exact(3) {
                let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
                let face_normal = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
                if face_normal.magnitude2() > 0.0 {
                    let face_normal = face_normal.normalize();
                    acc[a] += face_normal;
                    acc[b] += face_normal;
                    acc[c] += face_normal;
                }
            }
            acc.into_iter()
                .map(|n| if n.magnitude2() > 0.0 { n.normalize() } else { n })
                .collect()
        };

        let vertex = |i: u32| {
            let i = i as usize;
            Vertex {
                pos: positions[i],
                normal: normals[i],
                uv: uvs.get(i).copied().unwrap_or_else(Vec2::zero),
            }
        };
        let triangles: Vec<Triangle> = mesh
            .indices
            .chunks_exact(3)
            .map(|f| Triangle::new(vertex(f[0]), vertex(f[1]), vertex(f[2])))
            .filter(|t| !t.is_degenerate())
            .collect();
        if triangles.is_empty() {
            continue;
        }
        let node = avatar.add_node(&model.name, ROOT, Trs::default());
        avatar.attach_mesh(node, Mesh { triangles, material });
    }

    if avatar.triangle_count() == 0 {
        return Err(AssetError::Empty(name.to_string()));
    }
    Ok(avatar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Quaternion, Rad, Rotation3};

    const CUBE_CORNER: &str = "\
o corner
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
f 1 3 2
f 1 2 4
f 1 4 3
f 2 3 4
";

    #[test]
    fn obj_without_normals_gets_averaged_normals() {
        let model = load_obj("corner", CUBE_CORNER.as_bytes()).unwrap();
        assert_eq!(model.triangle_count(), 4);
        assert_eq!(model.nodes[1].parent, Some(ROOT));
        let tri = &model.meshes[0].triangles[0];
        for v in &tri.vertices {
            assert!((v.normal.magnitude() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn obj_without_faces_is_empty() {
        let err = load_obj("points", b"v 0 0 0\nv 1 0 0\n").unwrap_err();
        assert!(matches!(err, AssetError::Empty(_)));
    }

    #[test]
    fn world_matrices_compose_down_the_tree() {
        let mut model = AvatarModel::new("root");
        let child = model.add_node("arm", ROOT, Trs::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        let mut pose = model.rest_pose();
        pose[ROOT].rotation = Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_2));
        let world = model.world_matrices(&pose);
        let tip = world[child] * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(tip.x.abs() < 1e-5);
        assert!((tip.z + 1.0).abs() < 1e-5);
    }

    #[test]
    fn bounds_ignore_root_placement() {
        let mut model = load_obj("corner", CUBE_CORNER.as_bytes()).unwrap();
        model.nodes[ROOT].rest.translation = Vec3::new(10.0, 0.0, 0.0);
        let (min, max) = model.bounds().unwrap();
        assert_eq!(min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Vec3::new(1.0, 1.0, 1.0));
    }
}
