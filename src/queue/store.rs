use std::path::{Path, PathBuf};
use async_trait::async_trait;
use super::errors::Result;

/// 持久化存储 trait - 待上传目录是队列内容的唯一权威来源
#[async_trait]
pub trait SpoolStore: Send + Sync {
    /// 保存一份待上传数据，返回落盘路径
    async fn save(&self, payload: &[u8], name: &str) -> Result<PathBuf>;

    /// 列出所有待上传项，按文件名升序
    async fn list(&self) -> Result<Vec<PathBuf>>;

    /// 删除单个待上传项
    async fn delete(&self, path: &Path) -> Result<()>;

    /// 清空整个目录
    async fn clear_all(&self) -> Result<()>;
}

/// 基于本地文件系统的存储实现
#[derive(Debug, Clone)]
pub struct FsSpool {
    dir: PathBuf,
    extension: String,
}

impl FsSpool {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SpoolStore for FsSpool {
    async fn save(&self, payload: &[u8], name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(format!("{}.{}", name, self.extension));
        tokio::fs::write(&path, payload).await?;

        Ok(path)
    }

    async fn list(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // 目录还不存在等价于空队列
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let matches =
                path.extension().and_then(|ext| ext.to_str()) == Some(self.extension.as_str());
            if matches {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path).await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
