//! 主模型资源的导入

use std::collections::HashMap;

use cgmath::{Quaternion, Vector2 as Vec2, Vector3 as Vec3};
use gltf::animation::util::ReadOutputs;
use log::{debug, info};

use crate::animation::{Clip, Interpolation, Keyframes, Track, Trs};
use crate::color::Color;
use crate::error::AssetError;
use crate::fetch::Location;
use crate::material::Material;
use crate::model::{self, AvatarModel, Mesh, ROOT};
use crate::vertex::{Triangle, Vertex};

pub const DEFAULT_ASSET_LOCATION: &str = "models/robot.glb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    Gltf,
    Obj,
}

impl AssetFormat {
    pub fn detect(location: &Location) -> Self {
        match location.extension().as_deref() {
            Some("obj") => AssetFormat::Obj,
            _ => AssetFormat::Gltf,
        }
    }
}

/// 获取并导入 `location` 处的资源
pub fn load_asset(location: &Location) -> Result<AvatarModel, AssetError> {
    let name = location.to_string();
    let model = match (AssetFormat::detect(location), location) {
        (AssetFormat::Obj, _) => model::load_obj(&name, &location.fetch_bytes()?)?,
        // 本地 .gltf 可能引用同目录的缓冲文件，交给导入器解析
        (AssetFormat::Gltf, Location::File(path)) => {
            if !path.exists() {
                // 返回获取错误而不是 glTF 错误
                location.fetch_bytes()?;
            }
            let (document, buffers, _) = gltf::import(path)?;
            from_gltf(&name, &document, &buffers)?
        }
        (AssetFormat::Gltf, Location::Http(_)) => {
            let bytes = location.fetch_bytes()?;
            let (document, buffers, _) = gltf::import_slice(&bytes)?;
            from_gltf(&name, &document, &buffers)?
        }
    };
    info!(
        "imported {name}: {} nodes, {} triangles, {} clips",
        model.nodes.len(),
        model.triangle_count(),
        model.clips.len()
    );
    Ok(model)
}

fn convert_material(material: &gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    let [er, eg, eb] = material.emissive_factor();
    Material {
        name: material.name().unwrap_or("material").to_string(),
        // glTF 的系数已经是线性值
        base_color: Vec3::new(r, g, b),
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: Vec3::new(er, eg, eb),
        emissive_intensity: material.emissive_strength().unwrap_or(1.0),
        env_map_intensity: 1.0,
    }
}

fn convert_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    material: usize,
) -> Option<Mesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        debug!("skipping primitive with mode {:?}", primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|t| t.into_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let vertex = |i: u32| -> Option<Vertex> {
        let i = i as usize;
        let pos = Vec3::from(*positions.get(i)?);
        let normal = normals
            .as_ref()
            .and_then(|n| n.get(i))
            .map_or(Vec3::new(0.0, 0.0, 0.0), |n| Vec3::from(*n));
        let uv = uvs
            .as_ref()
            .and_then(|t| t.get(i))
            .map_or(Vec2::new(0.0, 0.0), |t| Vec2::from(*t));
        Some(Vertex { pos, normal, uv })
    };

    let mut triangles = Vec::with_capacity(indices.len() / 3);
    for face in indices.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (vertex(face[0]), vertex(face[1]), vertex(face[2])) else {
            continue;
        };
        let mut tri = Triangle::new(a, b, c);
        if tri.is_degenerate() {
            continue;
        }
        if normals.is_none() {
            for v in &mut tri.vertices {
                v.normal = tri.normal;
            }
        }
        triangles.push(tri);
    }
    (!triangles.is_empty()).then_some(Mesh { triangles, material })
}

fn rest_of(node: &gltf::Node) -> Trs {
    let (t, [x, y, z, w], s) = node.transform().decomposed();
    Trs {
        translation: Vec3::from(t),
        rotation: Quaternion::new(w, x, y, z),
        scale: Vec3::from(s),
    }
}

/// 三次样条输出每个关键帧为 `[入切线, 值, 出切线]`
fn values<T>(all: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        all.into_iter().skip(1).step_by(3).collect()
    } else {
        all
    }
}

fn convert_animation(
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
    node_map: &HashMap<usize, usize>,
) -> Clip {
    let mut tracks = Vec::new();
    for channel in animation.channels() {
        let Some(&node) = node_map.get(&channel.target().node().index()) else {
            continue;
        };
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
        let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        let sampler = channel.sampler().interpolation();
        let cubic = sampler == gltf::animation::Interpolation::CubicSpline;
        let interpolation = match sampler {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            _ => Interpolation::Linear,
        };
        let keyframes = match outputs {
            ReadOutputs::Translations(v) => {
                Keyframes::Translation(values(v.map(Vec3::from).collect(), cubic))
            }
            ReadOutputs::Scales(v) => Keyframes::Scale(values(v.map(Vec3::from).collect(), cubic)),
            ReadOutputs::Rotations(r) => Keyframes::Rotation(values(
                r.into_f32()
                    .map(|[x, y, z, w]| Quaternion::new(w, x, y, z))
                    .collect(),
                cubic,
            )),
            ReadOutputs::MorphTargetWeights(_) => {
                debug!("skipping morph-target channel");
                continue;
            }
        };
        tracks.push(Track {
            node,
            times,
            keyframes,
            interpolation,
        });
    }
    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation_{}", animation.index()));
    Clip::new(name, tracks)
}

/// 构建以 glTF 场景本身为根节点的 [`AvatarModel`]
pub fn from_gltf(
    name: &str,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<AvatarModel, AssetError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| AssetError::Empty(name.to_string()))?;

    let mut avatar = AvatarModel::new(scene.name().unwrap_or("Scene"));
    for material in document.materials() {
        avatar.add_material(convert_material(&material));
    }
    let default_material = avatar.add_material(Material::standard("default", Color::WHITE, 0.0, 1.0));

    let mut node_map = HashMap::new();
    let mut stack: Vec<(gltf::Node, usize)> = scene.nodes().map(|n| (n, ROOT)).collect();
    stack.reverse();
    while let Some((node, parent)) = stack.pop() {
        let index = avatar.add_node(node.name().unwrap_or("node"), parent, rest_of(&node));
        node_map.insert(node.index(), index);
        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                let material = primitive.material().index().unwrap_or(default_material);
                if let Some(mesh) = convert_primitive(&primitive, buffers, material) {
                    avatar.attach_mesh(index, mesh);
                }
            }
        }
        let children: Vec<_> = node.children().map(|c| (c, index)).collect();
        stack.extend(children.into_iter().rev());
    }

    if avatar.triangle_count() == 0 {
        return Err(AssetError::Empty(name.to_string()));
    }
    avatar.clips = document
        .animations()
        .map(|a| convert_animation(&a, buffers, &node_map))
        .collect();
    Ok(avatar)
}
