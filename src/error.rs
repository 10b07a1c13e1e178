use std::path::PathBuf;

/// 无法获取 [`crate::fetch::Location`] 对应的原始字节
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("{location} is not valid UTF-8")]
    NotText { location: String },
}

/// 可选配置文档无法使用的原因
///
/// 所有情况都可恢复：加载器记录日志并保留默认值
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("malformed configuration document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("configuration worker stopped before producing a result")]
    WorkerLost,
}

/// 主模型资源无法使用的原因
///
/// 所有情况都会让展示器进入备用状态
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("glTF import failed: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("OBJ import failed: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("asset {0} contains no triangle geometry")]
    Empty(String),

    #[error("asset worker stopped before producing a result")]
    WorkerLost,
}
