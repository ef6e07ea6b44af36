use anyhow::Result;
use async_trait::async_trait;

use crate::models::SourceVideo;

/// Read access to the monitored channel's uploads.
///
/// Errors are transient from the caller's point of view: the polling loop
/// waits and tries again on a later cycle.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Every upload of the channel, in any order.
    async fn fetch_all_videos(&self) -> Result<Vec<SourceVideo>>;

    /// The most recent upload, used as a cheap check before a full fetch.
    async fn fetch_latest_video(&self) -> Result<Option<SourceVideo>>;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of full-fetch results. Once the script runs
    /// out the last snapshot keeps being returned.
    pub(crate) struct ScriptedSource {
        snapshots: Mutex<VecDeque<Result<Vec<SourceVideo>, String>>>,
        last: Mutex<Vec<SourceVideo>>,
        latest: Mutex<Option<SourceVideo>>,
        pub(crate) full_fetches: AtomicUsize,
        pub(crate) latest_fetches: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(snapshots: Vec<Result<Vec<SourceVideo>, String>>) -> Self {
            ScriptedSource {
                snapshots: Mutex::new(snapshots.into()),
                last: Mutex::new(Vec::new()),
                latest: Mutex::new(None),
                full_fetches: AtomicUsize::new(0),
                latest_fetches: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_latest(self, latest: SourceVideo) -> Self {
            *self.latest.lock().unwrap() = Some(latest);
            self
        }

        pub(crate) fn full_fetch_count(&self) -> usize {
            self.full_fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VideoSource for ScriptedSource {
        async fn fetch_all_videos(&self) -> Result<Vec<SourceVideo>> {
            self.full_fetches.fetch_add(1, Ordering::SeqCst);
            let next = self.snapshots.lock().unwrap().pop_front();
            match next {
                Some(Ok(videos)) => {
                    *self.last.lock().unwrap() = videos.clone();
                    Ok(videos)
                }
                Some(Err(message)) => Err(anyhow::anyhow!(message)),
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }

        async fn fetch_latest_video(&self) -> Result<Option<SourceVideo>> {
            self.latest_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.latest.lock().unwrap().clone())
        }
    }
}
