use std::time::Duration;

use anyhow::Result;
use log::{error, info};

use crate::models::{History, NewVideoDiff};
use crate::services::detector::detect_difference;
use crate::services::source::VideoSource;
use crate::services::statistics::compute_history;
use crate::utils::{format_clock, random_wait};

/// How much evidence a new upload needs before the bot acts on it.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationPolicy {
    /// Consecutive positive probes needed. 0 and 1 both trust the first one.
    pub required_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    /// Wait applied after a failed fetch, before giving up on the cycle.
    pub error_backoff_min: Duration,
    pub error_backoff_max: Duration,
    /// Ask for the latest upload first and skip the full fetch when it is
    /// already stored.
    pub precheck_latest: bool,
}

/// Per-cycle progress. Dropped when the cycle ends.
#[derive(Debug, Clone, Default)]
pub struct VerificationState {
    pub attempts_completed: u32,
    pub required_attempts: u32,
    pub last_fetched_snapshot: Option<History>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Nothing new was observed.
    NoUpdate,
    /// A candidate was seen but a later probe did not confirm it.
    Aborted { candidate_id: String },
    /// The source failed. The cycle was skipped after the error backoff.
    SourceUnavailable,
    /// The candidate survived every re-probe. `snapshot` is the last fetch.
    Confirmed { diff: NewVideoDiff, snapshot: History },
}

/// Repeats change detection against the source until a new upload has been
/// seen often enough to be trusted.
pub struct Verifier<'a> {
    source: &'a dyn VideoSource,
    policy: &'a VerificationPolicy,
}

impl<'a> Verifier<'a> {
    pub fn new(source: &'a dyn VideoSource, policy: &'a VerificationPolicy) -> Self {
        Verifier { source, policy }
    }

    pub async fn verify(&self, stored: &History) -> VerificationOutcome {
        let mut state = VerificationState {
            attempts_completed: 0,
            required_attempts: self.policy.required_attempts,
            last_fetched_snapshot: None,
        };

        let diff = match self.probe(stored, &mut state).await {
            Ok(Some(diff)) => diff,
            Ok(None) => {
                info!("No updates");
                return VerificationOutcome::NoUpdate;
            }
            Err(e) => return self.skip_cycle(e).await,
        };
        let candidate_id = diff.candidate.id.clone();
        state.attempts_completed = 1;

        let mut confirmed = diff;
        while state.attempts_completed < state.required_attempts {
            info!(
                "Seems like there are updates (video {}). Verifications: {}/{}",
                candidate_id, state.attempts_completed, state.required_attempts
            );
            wait(self.policy.backoff_min, self.policy.backoff_max).await;

            match self.probe(stored, &mut state).await {
                Ok(Some(diff)) if diff.candidate.id == candidate_id => {
                    state.attempts_completed += 1;
                    confirmed = diff;
                }
                Ok(Some(diff)) => {
                    info!(
                        "Candidate changed from {} to {}, abandoning cycle",
                        candidate_id, diff.candidate.id
                    );
                    return VerificationOutcome::Aborted { candidate_id };
                }
                Ok(None) => {
                    info!("Video {candidate_id} is gone on re-probe, abandoning cycle");
                    return VerificationOutcome::Aborted { candidate_id };
                }
                Err(e) => return self.skip_cycle(e).await,
            }
        }

        info!(
            "There are updates (video {}). Verifications: {}/{}",
            candidate_id,
            state.attempts_completed,
            state.required_attempts.max(1)
        );
        VerificationOutcome::Confirmed {
            diff: confirmed,
            snapshot: state.last_fetched_snapshot.unwrap_or_default(),
        }
    }

    /// One detection pass: optional latest-upload check, then a full fetch.
    async fn probe(
        &self,
        stored: &History,
        state: &mut VerificationState,
    ) -> Result<Option<NewVideoDiff>> {
        if self.policy.precheck_latest {
            if let Some(latest) = self.source.fetch_latest_video().await? {
                if stored.contains(&latest.id) {
                    return Ok(None);
                }
            }
        }

        let fetched = compute_history(self.source.fetch_all_videos().await?);
        let diff = detect_difference(stored, &fetched);
        state.last_fetched_snapshot = Some(fetched);
        Ok(diff)
    }

    async fn skip_cycle(&self, e: anyhow::Error) -> VerificationOutcome {
        error!("Error requesting video source: {e:#}");
        wait(self.policy.error_backoff_min, self.policy.error_backoff_max).await;
        VerificationOutcome::SourceUnavailable
    }
}

/// Sleeps for a random interval in `[min, max]`.
pub async fn wait(min: Duration, max: Duration) {
    let wait_time = random_wait(min, max);
    info!("Recheck in {}", format_clock(wait_time.as_secs_f64()));
    tokio::time::sleep(wait_time).await;
}
