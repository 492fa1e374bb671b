use std::sync::Arc;
use anyhow::Context;
use bytes::Bytes;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use courier::config::Config;
use courier::{FsSpool, HttpBackend, QueueEvent, UploadQueue, UploadStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let config = Config::load("config.toml").context("failed to load config.toml")?;

    let store = Arc::new(FsSpool::new(&config.spool_dir, config.local_extension.clone()));
    let backend = Arc::new(HttpBackend::new(&config.endpoint, config.token.clone())?);
    let queue = UploadQueue::new(store, backend, config.queue_config());
    let mut events = queue.subscribe_events();

    // 参数里的文件入队，没有参数就只恢复残留的队列
    let mut payloads = Vec::new();
    for arg in std::env::args().skip(1) {
        let data = tokio::fs::read(&arg)
            .await
            .with_context(|| format!("failed to read {arg}"))?;
        payloads.push(Bytes::from(data));
    }

    if payloads.is_empty() {
        queue.resume_pending().await?;
    } else {
        let keys = queue.enqueue(payloads).await?;
        for key in &keys {
            println!("{key}");
        }
    }

    loop {
        match events.recv().await {
            Ok(QueueEvent::Progress(fraction)) => {
                tracing::info!("progress: {:.0}%", fraction * 100.0);
            }
            Ok(QueueEvent::Status(UploadStatus::Started)) => {
                tracing::info!("upload started");
            }
            Ok(QueueEvent::Status(UploadStatus::Failed(reason))) => {
                tracing::warn!("upload failed: {reason}");
            }
            Ok(QueueEvent::Status(UploadStatus::Finished(remaining))) => {
                tracing::info!("upload finished, {remaining} remaining");
            }
            Ok(QueueEvent::QueueFinished) => break,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }

    queue.shutdown().await?;

    Ok(())
}
