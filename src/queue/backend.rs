use std::path::Path;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, StatusCode};
use tokio::fs::File;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use url::Url;
use super::errors::{QueueError, Result};
use super::stream::ProgressStream;

/// 进度上报通道，分数范围 0.0 ~ 1.0，可能乱序、重复
pub type ProgressSender = mpsc::UnboundedSender<f32>;

/// 传输后端 trait - 单次上传/下载，完成结果以返回值为准
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// 上传本地文件到远端 key
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        content_type: &str,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<()>;

    /// 按远端 key 下载完整内容
    async fn download(&self, remote_key: &str, progress: ProgressSender) -> Result<Bytes>;
}

const UPLOAD_BUFFER_SIZE: usize = 64 * 1024;

/// 简单对象存储后端：PUT 上传、GET 下载，可选 bearer token
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// 必须先配置好 endpoint 才能使用，缺失是硬错误而不是静默跳过
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(QueueError::NotConfigured("endpoint is not set".to_string()));
        }

        let endpoint = Url::parse(endpoint)
            .map_err(|err| QueueError::NotConfigured(format!("invalid endpoint: {err}")))?;

        Ok(Self {
            client: Client::new(),
            endpoint,
            token,
        })
    }

    fn object_url(&self, remote_key: &str) -> Result<Url> {
        let raw = format!(
            "{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            remote_key
        );
        Url::parse(&raw).map_err(|err| QueueError::Internal(format!("invalid object url: {err}")))
    }

    fn auth_header(&self) -> Result<Option<HeaderValue>> {
        match &self.token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|err| QueueError::NotConfigured(format!("invalid token: {err}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TransferBackend for HttpBackend {
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        content_type: &str,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<()> {
        let url = self.object_url(remote_key)?;

        let file = File::open(local_path).await?;
        let file_size = file.metadata().await?.len();

        let reader_stream = ReaderStream::with_capacity(file, UPLOAD_BUFFER_SIZE);
        let body = reqwest::Body::wrap_stream(ProgressStream::new(
            reader_stream,
            file_size,
            progress,
        ));

        let mut request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, file_size)
            .body(body);
        if let Some(auth) = self.auth_header()? {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = tokio::select! {
            response = request.send() => response?,
            _ = cancel.cancelled() => return Err(QueueError::Cancelled),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(QueueError::server_error(
                status.as_u16(),
                "upload rejected by server",
            ));
        }

        Ok(())
    }

    async fn download(&self, remote_key: &str, progress: ProgressSender) -> Result<Bytes> {
        let url = self.object_url(remote_key)?;

        let mut request = self.client.get(url);
        if let Some(auth) = self.auth_header()? {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(QueueError::server_error(status.as_u16(), "object not found"));
        }
        if !status.is_success() {
            return Err(QueueError::server_error(
                status.as_u16(),
                "download rejected by server",
            ));
        }

        let total = response.content_length().unwrap_or(0);
        let mut received = BytesMut::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            received.extend_from_slice(&chunk);
            if total > 0 {
                let fraction = ((received.len() as f64 / total as f64).min(1.0)) as f32;
                let _ = progress.send(fraction);
            }
        }

        // body 流正常走完才算完整
        let _ = progress.send(1.0);

        Ok(received.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_endpoint_is_hard_error() {
        let result = HttpBackend::new("", None);
        assert!(matches!(result, Err(QueueError::NotConfigured(_))));
    }

    #[test]
    fn test_invalid_endpoint_is_hard_error() {
        let result = HttpBackend::new("not a url", None);
        assert!(matches!(result, Err(QueueError::NotConfigured(_))));
    }

    #[test]
    fn test_object_url_joins_key() {
        let backend = HttpBackend::new("https://storage.example.com/bucket/", None).unwrap();
        let url = backend
            .object_url("uploads/abc.png")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.example.com/bucket/uploads/abc.png"
        );
    }
}
