//! 可配置的 3D 模型舞台：配置加载（深度合并到内置默认值之上）、
//! 带程序化备用模型的展示器、
//! 灯光组构建以及软件光栅化的场景宿主。

pub mod animation;
pub mod app;
pub mod asset;
pub mod avatar;
pub mod camera;
pub mod color;
pub mod config;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod framebuffer;
pub mod lighting;
pub mod loader;
pub mod material;
pub mod merge;
pub mod model;
pub mod pending;
pub mod rasterizer;
pub mod renderer;
pub mod scene;
pub mod vertex;
