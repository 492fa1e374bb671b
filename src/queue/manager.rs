use std::sync::Arc;
use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use super::backend::TransferBackend;
use super::errors::{QueueError, Result};
use super::notify::{EpisodeNotifier, TracingNotifier};
use super::progress::ProgressGate;
use super::store::SpoolStore;
use super::types::{QueueCommand, QueueConfig, QueueEvent};
use super::worker::QueueWorker;

const COMMAND_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 256;

/// 上传队列句柄
///
/// 显式构造、显式持有：存储与后端都通过构造函数注入，
/// 生命周期以 [`shutdown`](Self::shutdown) 结束。
pub struct UploadQueue {
    command_tx: mpsc::Sender<QueueCommand>,
    event_tx: broadcast::Sender<QueueEvent>,
    backend: Arc<dyn TransferBackend>,
    worker_handle: JoinHandle<()>,
}

impl UploadQueue {
    pub fn new(
        store: Arc<dyn SpoolStore>,
        backend: Arc<dyn TransferBackend>,
        config: QueueConfig,
    ) -> Self {
        Self::with_notifier(store, backend, config, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(
        store: Arc<dyn SpoolStore>,
        backend: Arc<dyn TransferBackend>,
        config: QueueConfig,
        notifier: Arc<dyn EpisodeNotifier>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        let worker = QueueWorker::new(store, backend.clone(), config, notifier, event_tx.clone());
        let worker_handle = tokio::spawn(worker.run(command_rx));

        Self {
            command_tx,
            event_tx,
            backend,
            worker_handle,
        }
    }

    /// 订阅队列事件；没有订阅者队列照常工作，
    /// 订阅者中途退订也不会影响队列
    pub fn subscribe_events(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// Persists the payloads and returns their remote keys in input order.
    ///
    /// 返回 key 只说明寻址已定，不代表上传完成。
    /// 任何一项持久化失败都会中止整个批次。
    pub async fn enqueue(&self, payloads: Vec<Bytes>) -> Result<Vec<String>> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(QueueCommand::Enqueue {
                payloads,
                reply: reply_tx,
            })
            .await
            .map_err(|_| QueueError::Shutdown)?;

        reply_rx.await.map_err(|_| QueueError::Shutdown)?
    }

    /// Kicks the queue if it is idle; a no-op while a transfer is in flight.
    pub async fn resume_pending(&self) -> Result<()> {
        self.command_tx
            .send(QueueCommand::ResumePending)
            .await
            .map_err(|_| QueueError::Shutdown)
    }

    /// 取消当前在途传输（尽力而为）。返回是否确实有传输被取消。
    /// 被取消项保留在本地存储中，下次 resume 仍会上传。
    pub async fn cancel_current(&self) -> Result<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(QueueCommand::CancelCurrent { reply: reply_tx })
            .await
            .map_err(|_| QueueError::Shutdown)?;

        reply_rx.await.map_err(|_| QueueError::Shutdown)
    }

    /// Downloads a remote object in full.
    ///
    /// 与上传状态机完全独立，不占用上传槽位。
    /// 只有后端干净结束、进度到 1.0 且拿到非空数据才算成功。
    pub async fn download(&self, remote_key: &str) -> Result<Bytes> {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let mut gate = ProgressGate::new();

        let download = self.backend.download(remote_key, progress_tx);
        tokio::pin!(download);

        let bytes = loop {
            tokio::select! {
                biased;
                Some(fraction) = progress_rx.recv() => {
                    let _ = gate.advance(fraction);
                }
                result = &mut download => break result?,
            }
        };

        while let Ok(fraction) = progress_rx.try_recv() {
            let _ = gate.advance(fraction);
        }

        if !gate.is_complete() || bytes.is_empty() {
            return Err(QueueError::Interrupted);
        }

        Ok(bytes)
    }

    /// 关闭队列；在途传输会被放弃（持久化项保留）
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.command_tx.send(QueueCommand::Shutdown).await;
        self.worker_handle
            .await
            .map_err(|err| QueueError::Internal(format!("queue worker panicked: {err}")))
    }
}
