use std::pin::Pin;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use tokio::sync::mpsc;

pin_project! {
    /// 包装上传 body 流，按已发送字节数上报进度分数
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        sent: u64,
        total: u64,
        progress_tx: mpsc::UnboundedSender<f32>,
    }
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, total: u64, progress_tx: mpsc::UnboundedSender<f32>) -> Self {
        Self {
            inner,
            sent: 0,
            total,
            progress_tx,
        }
    }

    fn fraction(sent: u64, total: u64) -> f32 {
        if total == 0 {
            1.0
        } else {
            ((sent as f64 / total as f64).min(1.0)) as f32
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    *this.sent += chunk.len() as u64;
                    let _ = this
                        .progress_tx
                        .send(Self::fraction(*this.sent, *this.total));
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                // 流结束时重发当前进度；若提前结束，分数不足 1.0，
                // 由队列判定为中断
                let _ = this
                    .progress_tx
                    .send(Self::fraction(*this.sent, *this.total));
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
            Poll::Pending => Poll::Pending,
        }
    }
}
