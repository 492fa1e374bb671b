use std::path::PathBuf;
use std::sync::Arc;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use super::backend::TransferBackend;
use super::errors::Result;
use super::notify::EpisodeNotifier;
use super::progress::ProgressGate;
use super::store::SpoolStore;
use super::types::{PendingUpload, QueueCommand, QueueConfig, QueueEvent, UploadId, UploadStatus};

/// 传输任务回报给工作循环的消息
pub(crate) enum TransferMsg {
    Progress(f32),
    Done(Result<()>),
}

/// 队列工作循环：所有状态都由它独占，命令与传输回报串行处理，
/// 这保证了 `is_uploading` 的检查与置位不会交错
pub(crate) struct QueueWorker {
    store: Arc<dyn SpoolStore>,
    backend: Arc<dyn TransferBackend>,
    config: QueueConfig,
    notifier: Arc<dyn EpisodeNotifier>,
    event_tx: broadcast::Sender<QueueEvent>,

    is_uploading: bool,
    current: Option<PendingUpload>,
    progress: ProgressGate,
    cancel_token: Option<CancellationToken>,

    transfer_tx: mpsc::UnboundedSender<TransferMsg>,
    transfer_rx: mpsc::UnboundedReceiver<TransferMsg>,
}

impl QueueWorker {
    pub(crate) fn new(
        store: Arc<dyn SpoolStore>,
        backend: Arc<dyn TransferBackend>,
        config: QueueConfig,
        notifier: Arc<dyn EpisodeNotifier>,
        event_tx: broadcast::Sender<QueueEvent>,
    ) -> Self {
        let (transfer_tx, transfer_rx) = mpsc::unbounded_channel();

        Self {
            store,
            backend,
            config,
            notifier,
            event_tx,
            is_uploading: false,
            current: None,
            progress: ProgressGate::new(),
            cancel_token: None,
            transfer_tx,
            transfer_rx,
        }
    }

    /// 主事件循环
    pub(crate) async fn run(mut self, mut command_rx: mpsc::Receiver<QueueCommand>) {
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    // 管理端已被丢弃
                    None => break,
                },
                Some(msg) = self.transfer_rx.recv() => {
                    self.handle_transfer_msg(msg).await;
                }
            }
        }

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }

    /// Returns `false` when the worker should stop.
    async fn handle_command(&mut self, command: QueueCommand) -> bool {
        match command {
            QueueCommand::Enqueue { payloads, reply } => {
                let result = self.enqueue(payloads).await;
                let _ = reply.send(result);
            }
            QueueCommand::ResumePending => {
                self.resume_pending().await;
            }
            QueueCommand::CancelCurrent { reply } => {
                let _ = reply.send(self.cancel_current());
            }
            QueueCommand::Shutdown => return false,
        }

        true
    }

    /// 批量入队：每项生成 id、算好远端 key、落盘；
    /// 任何一项落盘失败都会中止整个批次
    async fn enqueue(&mut self, payloads: Vec<Bytes>) -> Result<Vec<String>> {
        let mut remote_keys = Vec::with_capacity(payloads.len());

        for payload in &payloads {
            let id = UploadId::new().to_string();
            match self.store.save(payload, &id).await {
                Ok(path) => {
                    tracing::debug!(%id, path = %path.display(), "persisted payload");
                    remote_keys.push(self.config.remote_key_for(&id));
                }
                Err(err) => {
                    tracing::error!(%id, %err, "failed to persist payload, aborting batch");
                    return Err(err);
                }
            }
        }

        if !self.is_uploading {
            self.resume_pending().await;
        }

        Ok(remote_keys)
    }

    /// 恢复待上传项：已有传输在途时是 no-op
    async fn resume_pending(&mut self) {
        if self.is_uploading {
            return;
        }

        let entries = match self.store.list().await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(%err, "failed to list pending uploads");
                self.finish();
                return;
            }
        };

        match entries.into_iter().next() {
            Some(path) => self.start_transfer(path).await,
            // 队列已排空
            None => self.finish(),
        }
    }

    async fn start_transfer(&mut self, path: PathBuf) {
        let pending = self.pending_from_path(path).await;

        self.is_uploading = true;
        self.progress.reset();
        let _ = self.event_tx.send(QueueEvent::Progress(0.0));
        let _ = self.event_tx.send(QueueEvent::Status(UploadStatus::Started));

        let cancel_token = CancellationToken::new();
        self.cancel_token = Some(cancel_token.clone());

        tracing::info!(
            id = %pending.id,
            key = %pending.remote_key,
            enqueued_at = %pending.enqueued_at,
            "starting upload"
        );

        let backend = self.backend.clone();
        let transfer_tx = self.transfer_tx.clone();
        let content_type = self.config.content_type.clone();
        let local_path = pending.local_path.clone();
        let remote_key = pending.remote_key.clone();
        self.current = Some(pending);

        tokio::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
            let upload = backend.upload(
                &local_path,
                &remote_key,
                &content_type,
                progress_tx,
                cancel_token,
            );
            tokio::pin!(upload);

            // 进度优先转发，保证 Done 之前所有进度都已送达
            let result = loop {
                tokio::select! {
                    biased;
                    Some(fraction) = progress_rx.recv() => {
                        if transfer_tx.send(TransferMsg::Progress(fraction)).is_err() {
                            return;
                        }
                    }
                    result = &mut upload => break result,
                }
            };

            while let Ok(fraction) = progress_rx.try_recv() {
                let _ = transfer_tx.send(TransferMsg::Progress(fraction));
            }
            let _ = transfer_tx.send(TransferMsg::Done(result));
        });
    }

    async fn handle_transfer_msg(&mut self, msg: TransferMsg) {
        match msg {
            TransferMsg::Progress(fraction) => {
                if !self.is_uploading {
                    return;
                }
                if let Some(accepted) = self.progress.advance(fraction) {
                    let _ = self.event_tx.send(QueueEvent::Progress(accepted));
                }
            }
            TransferMsg::Done(result) => self.handle_completion(result).await,
        }
    }

    async fn handle_completion(&mut self, result: Result<()>) {
        if !self.is_uploading {
            return;
        }

        match result {
            Err(err) => {
                tracing::warn!(%err, "upload failed");
                self.fail_current(err.to_string());
            }
            // 后端说完成但进度没到 1.0，按中断处理
            Ok(()) if !self.progress.is_complete() => {
                tracing::warn!(
                    progress = self.progress.value(),
                    "upload completed without reaching full progress"
                );
                self.fail_current("interrupted".to_string());
            }
            Ok(()) => self.complete_current().await,
        }
    }

    /// 成功：删掉本地持久化项，报告剩余数量，立刻接力下一项
    async fn complete_current(&mut self) {
        if let Some(pending) = self.current.take() {
            tracing::info!(id = %pending.id, key = %pending.remote_key, "upload finished");
            // 删除失败只记日志：远端已经传成功，宁可下次重复上传
            if let Err(err) = self.store.delete(&pending.local_path).await {
                tracing::warn!(%err, path = %pending.local_path.display(), "failed to delete uploaded item");
            }
        }

        let remaining = match self.store.list().await {
            Ok(entries) => entries.len(),
            Err(err) => {
                tracing::error!(%err, "failed to count pending uploads");
                0
            }
        };
        let _ = self
            .event_tx
            .send(QueueEvent::Status(UploadStatus::Finished(remaining)));

        self.is_uploading = false;
        self.cancel_token = None;
        self.resume_pending().await;
    }

    /// 失败：保留本地持久化项，结束这一轮
    fn fail_current(&mut self, reason: String) {
        let _ = self
            .event_tx
            .send(QueueEvent::Status(UploadStatus::Failed(reason)));
        self.finish();
    }

    /// 这一轮没有可继续的工作了，每轮只走一次
    fn finish(&mut self) {
        self.is_uploading = false;
        self.current = None;
        self.cancel_token = None;
        let _ = self.event_tx.send(QueueEvent::QueueFinished);
        self.notifier.episode_finished();
    }

    /// 取消在途传输；保留持久化项，等待下次 resume
    fn cancel_current(&mut self) -> bool {
        match &self.cancel_token {
            Some(token) if self.is_uploading => {
                tracing::info!("cancelling current upload");
                token.cancel();
                true
            }
            _ => false,
        }
    }

    async fn pending_from_path(&self, path: PathBuf) -> PendingUpload {
        let id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();
        let enqueued_at = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|meta| meta.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        PendingUpload {
            remote_key: self.config.remote_key_for(&id),
            id,
            local_path: path,
            enqueued_at,
        }
    }
}
