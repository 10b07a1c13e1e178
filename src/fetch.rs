use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::FetchError;

/// 文档或资源的位置：本地路径或 `http(s)://` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Http(String),
}

impl Location {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Location::File(path.as_ref().to_path_buf())
    }

    /// 最后一段路径的小写扩展名（如果有）
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            Location::File(path) => path.file_name()?.to_str()?.to_string(),
            Location::Http(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.rsplit('/').next()?.to_string()
            }
        };
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }

    pub fn fetch_bytes(&self) -> Result<Vec<u8>, FetchError> {
        match self {
            Location::File(path) => std::fs::read(path).map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            }),
            Location::Http(url) => {
                let http = |source| FetchError::Http {
                    url: url.clone(),
                    source,
                };
                let response = reqwest::blocking::get(url).map_err(http)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                Ok(response.bytes().map_err(http)?.to_vec())
            }
        }
    }

    pub fn fetch_text(&self) -> Result<String, FetchError> {
        String::from_utf8(self.fetch_bytes()?).map_err(|_| FetchError::NotText {
            location: self.to_string(),
        })
    }
}

impl FromStr for Location {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Location::Http(s.to_string()))
        } else {
            Ok(Location::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Http(url) => f.write_str(url),
        }
    }
}
