pub mod config;
pub mod queue;

// 重新导出核心类型
pub use queue::{
    EpisodeNotifier,
    FsSpool,
    HttpBackend,
    QueueConfig,
    QueueError,
    QueueEvent,
    Result,
    SpoolStore,
    TransferBackend,
    UploadQueue,
    UploadStatus,
};
