use std::path::PathBuf;

use clap::Parser;
use log::info;

use metabot_stage::app::{self, StageOptions};
use metabot_stage::asset::DEFAULT_ASSET_LOCATION;
use metabot_stage::fetch::Location;
use metabot_stage::loader::DEFAULT_CONFIG_LOCATION;

/// 可配置的 3D 模型舞台
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// 配置文档（文件路径或 http(s) URL）
    #[arg(long, default_value = DEFAULT_CONFIG_LOCATION)]
    config: Location,

    /// 模型资源（.glb、.gltf 或 .obj；文件路径或 http(s) URL）
    #[arg(long, default_value = DEFAULT_ASSET_LOCATION)]
    model: Location,

    #[arg(long, default_value_t = 1024)]
    width: usize,

    #[arg(long, default_value_t = 720)]
    height: usize,

    /// 不打开窗口，直接渲染到此 PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// 截图前推进的帧数
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// 截图的超采样倍数
    #[arg(long, default_value_t = 2)]
    ssaa: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    anyhow::ensure!(cli.width > 0 && cli.height > 0, "width and height must be positive");

    let options = StageOptions {
        config: cli.config,
        asset: cli.model,
        width: cli.width,
        height: cli.height,
    };
    info!("config {}, model {}", options.config, options.asset);

    match cli.snapshot {
        Some(path) => {
            app::run_snapshot(&options, &path, cli.frames, cli.ssaa)?;
        }
        None => app::run_window(&options)?,
    }
    Ok(())
}
