mod backend;
mod errors;
mod manager;
mod notify;
mod progress;
mod store;
mod stream;
mod types;
mod worker;

pub use backend::{HttpBackend, ProgressSender, TransferBackend};
pub use errors::{QueueError, Result};
pub use manager::UploadQueue;
pub use notify::{EpisodeNotifier, TracingNotifier};
pub use progress::ProgressGate;
pub use store::{FsSpool, SpoolStore};
pub use stream::ProgressStream;
pub use types::{PendingUpload, QueueConfig, QueueEvent, UploadId, UploadStatus};
