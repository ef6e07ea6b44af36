use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};

use crate::config::BotConfig;
use crate::models::{History, NewVideoDiff, Notification};
use crate::services::chart::{ChartRenderer, PngChartRenderer};
use crate::services::history_store::HistoryStore;
use crate::services::notification::{compose_message, MessageStyle};
use crate::services::poster::{LogPoster, Poster, WebhookPoster};
use crate::services::source::VideoSource;
use crate::services::statistics::compute_history;
use crate::services::verification::{wait, VerificationOutcome, VerificationPolicy, Verifier};
use crate::services::youtube::YouTubeSource;

/// How a single polling cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No history existed, so it was built from a full fetch.
    Bootstrapped { videos: usize },
    NoUpdate,
    /// A candidate did not survive verification.
    Aborted,
    SourceUnavailable,
    /// A confirmed upload was rendered and persisted. `posted` tells whether
    /// the post went through.
    Updated { video_id: String, posted: bool },
    /// Rendering or persisting failed; nothing was posted.
    Failed,
}

pub struct ChannelBot {
    source: Arc<dyn VideoSource>,
    store: HistoryStore,
    chart: Arc<dyn ChartRenderer>,
    poster: Arc<dyn Poster>,
    policy: VerificationPolicy,
    style: MessageStyle,
    chart_path: PathBuf,
    history: Option<History>,
}

impl ChannelBot {
    pub fn new(
        source: Arc<dyn VideoSource>,
        store: HistoryStore,
        chart: Arc<dyn ChartRenderer>,
        poster: Arc<dyn Poster>,
        policy: VerificationPolicy,
        style: MessageStyle,
        chart_path: PathBuf,
    ) -> Self {
        ChannelBot {
            source,
            store,
            chart,
            poster,
            policy,
            style,
            chart_path,
            history: None,
        }
    }

    pub fn from_config(config: &BotConfig) -> anyhow::Result<Self> {
        let source = YouTubeSource::new(&config.youtube_api_key, &config.channel_id);
        let chart = PngChartRenderer::new(&config.chart_title, "mean duration (min)");
        let poster: Arc<dyn Poster> = match &config.webhook {
            Some(webhook) => Arc::new(WebhookPoster::new(webhook.clone())?),
            None => {
                if config.mode.is_production() {
                    warn!("No POST_WEBHOOK_URL configured, posts will only be logged");
                }
                Arc::new(LogPoster)
            }
        };

        Ok(ChannelBot::new(
            Arc::new(source),
            HistoryStore::new(&config.history_path),
            Arc::new(chart),
            poster,
            config.verification.clone(),
            config.message.clone(),
            config.chart_path.clone(),
        ))
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    /// Runs one full cycle. Every failure is logged and folded into the
    /// outcome; nothing here ends the process.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let stored = match self.stored_history() {
            Ok(Some(history)) => history,
            Ok(None) => return self.bootstrap().await,
            Err(e) => {
                error!("Failed to load stored history: {e:#}");
                return CycleOutcome::Failed;
            }
        };

        info!(
            "Checking for new videos ({} stored, latest {})",
            stored.len(),
            stored.latest().map(|r| r.id.as_str()).unwrap_or("-")
        );

        let outcome = Verifier::new(self.source.as_ref(), &self.policy)
            .verify(&stored)
            .await;
        match outcome {
            VerificationOutcome::NoUpdate => CycleOutcome::NoUpdate,
            VerificationOutcome::Aborted { candidate_id } => {
                info!("Update for {candidate_id} not confirmed, keeping stored history");
                CycleOutcome::Aborted
            }
            VerificationOutcome::SourceUnavailable => CycleOutcome::SourceUnavailable,
            VerificationOutcome::Confirmed { diff, snapshot } => {
                info!("Channel currently lists {} usable videos", snapshot.len());
                self.apply_update(&stored, diff).await
            }
        }
    }

    fn stored_history(&mut self) -> anyhow::Result<Option<History>> {
        if self.history.is_none() {
            self.history = self.store.load()?.filter(|history| !history.is_empty());
        }
        Ok(self.history.clone())
    }

    async fn bootstrap(&mut self) -> CycleOutcome {
        info!(
            "No stored history at {}, generating channel data",
            self.store.path().display()
        );
        let videos = match self.source.fetch_all_videos().await {
            Ok(videos) => videos,
            Err(e) => {
                error!("Failed to fetch channel videos for bootstrap: {e:#}");
                wait(self.policy.error_backoff_min, self.policy.error_backoff_max).await;
                return CycleOutcome::SourceUnavailable;
            }
        };

        let history = compute_history(videos);
        if history.is_empty() {
            warn!("Channel has no videos with a usable duration yet");
            return CycleOutcome::Bootstrapped { videos: 0 };
        }

        if let Err(e) = self.store.save(&history) {
            error!("Failed to store bootstrapped history: {e:#}");
            return CycleOutcome::Failed;
        }

        let videos = history.len();
        self.history = Some(history);
        CycleOutcome::Bootstrapped { videos }
    }

    /// Chart first, then persistence, then the post. A failed render or save
    /// ends the cycle before anything irreversible happens.
    async fn apply_update(&mut self, stored: &History, diff: NewVideoDiff) -> CycleOutcome {
        let video_id = diff.candidate.id.clone();
        if diff.pending > 0 {
            info!(
                "{} more new videos after {} will be handled in later cycles",
                diff.pending, video_id
            );
        }

        let updated = stored.with_appended(diff.candidate);
        let (Some(video), Some(previous), Some(current)) = (
            updated.position(&video_id).map(|i| &updated.records()[i]),
            stored.latest(),
            updated.latest(),
        ) else {
            error!("Confirmed video {video_id} is missing from the updated history");
            return CycleOutcome::Failed;
        };

        // `current` differs from `video` only when both share a publish time
        let notification = Notification {
            new_mean_seconds: current.running_mean_seconds,
            ..Notification::new(video, previous)
        };
        let text = compose_message(&notification, &self.style);

        if let Err(e) = self.chart.render(&updated, &self.chart_path) {
            error!("Failed to render chart, abandoning update of {video_id}: {e:#}");
            return CycleOutcome::Failed;
        }

        if let Err(e) = self.store.save(&updated) {
            error!("Failed to store history, abandoning update of {video_id}: {e:#}");
            return CycleOutcome::Failed;
        }
        info!(
            "Stored video {} ({}s), mean {:.2}s -> {:.2}s",
            video_id,
            notification.duration_seconds,
            notification.previous_mean_seconds,
            notification.new_mean_seconds
        );
        self.history = Some(updated);

        let posted = match self
            .poster
            .post(&text, Some(self.chart_path.as_path()))
            .await
        {
            Ok(()) => {
                info!("Posted update for {} via {}", video_id, self.poster.name());
                true
            }
            Err(e) => {
                error!("Failed to post update for {video_id}: {e:#}");
                false
            }
        };

        CycleOutcome::Updated { video_id, posted }
    }
}
