/// 一轮排空结束时的本地通知钩子，尽力而为
///
/// 由实现方决定是否真的打扰用户（比如仅在应用退到后台时弹通知）。
pub trait EpisodeNotifier: Send + Sync {
    fn episode_finished(&self);
}

/// 默认实现，只打一条日志
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl EpisodeNotifier for TracingNotifier {
    fn episode_finished(&self) {
        tracing::info!("upload queue finished");
    }
}
