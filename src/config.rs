use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::queue::{QueueConfig, QueueError, Result};

fn default_local_extension() -> String {
    "jpg".to_string()
}

fn default_remote_folder() -> String {
    "uploads".to_string()
}

fn default_remote_extension() -> String {
    ".png".to_string()
}

fn default_content_type() -> String {
    "image/png".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// 对象存储入口地址
    pub endpoint: String,
    /// 可选的 bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// 本地待上传目录
    pub spool_dir: PathBuf,
    /// 本地存储扩展名
    #[serde(default = "default_local_extension")]
    pub local_extension: String,
    /// 远端目录前缀
    #[serde(default = "default_remote_folder")]
    pub remote_folder: String,
    /// 远端 key 扩展名
    #[serde(default = "default_remote_extension")]
    pub remote_extension: String,
    /// 上传 Content-Type
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|err| QueueError::Config(err.to_string()))
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            remote_folder: self.remote_folder.clone(),
            remote_extension: self.remote_extension.clone(),
            content_type: self.content_type.clone(),
        }
    }
}
