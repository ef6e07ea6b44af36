use std::collections::HashSet;

use log::debug;

use crate::models::{History, SourceVideo, VideoRecord};
use crate::utils::parse_duration;

/// Builds the channel history from raw source data.
///
/// Duplicate ids collapse to their first occurrence, videos whose duration
/// parses to zero are dropped, and the rest is sorted by publish time before
/// the running means are computed. The result only depends on the set of
/// videos, not on the order they arrive in.
pub fn compute_history(videos: Vec<SourceVideo>) -> History {
    let total = videos.len();
    let records: Vec<VideoRecord> = videos
        .into_iter()
        .map(|video| VideoRecord {
            duration_seconds: parse_duration(&video.raw_duration),
            id: video.id,
            title: video.title,
            published_at: video.published_at,
            running_mean_seconds: 0.0,
        })
        .collect();

    let history = rebuild_history(records);
    if history.len() != total {
        debug!(
            "Computed history with {} of {} fetched videos",
            history.len(),
            total
        );
    }
    history
}

/// Re-derives ordering and every running mean for already parsed records.
pub fn rebuild_history(records: Vec<VideoRecord>) -> History {
    let mut seen = HashSet::new();
    let mut records: Vec<VideoRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .filter(|record| record.duration_seconds > 0)
        .collect();

    records.sort_by(|a, b| {
        a.published_at
            .cmp(&b.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut duration_sum: u64 = 0;
    for (index, record) in records.iter_mut().enumerate() {
        duration_sum += record.duration_seconds;
        record.running_mean_seconds = round2(duration_sum as f64 / (index + 1) as f64);
    }

    History::from_sorted(records)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    pub(crate) fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, n, 12, 0, 0).unwrap()
    }

    pub(crate) fn video(id: &str, published: DateTime<Utc>, duration: &str) -> SourceVideo {
        SourceVideo {
            id: id.to_string(),
            title: format!("Video {id}"),
            published_at: published,
            raw_duration: duration.to_string(),
        }
    }

    fn means(history: &History) -> Vec<f64> {
        history
            .records()
            .iter()
            .map(|r| r.running_mean_seconds)
            .collect()
    }

    #[test]
    fn running_means_follow_publish_order() {
        let history = compute_history(vec![
            video("c", day(3), "PT5M"),
            video("a", day(1), "PT10M"),
            video("b", day(2), "PT20M"),
        ]);

        let ids: Vec<&str> = history.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(means(&history), vec![600.0, 900.0, 700.0]);
    }

    #[test]
    fn empty_input_gives_empty_history() {
        assert!(compute_history(Vec::new()).is_empty());
    }

    #[test]
    fn zero_length_videos_are_discarded() {
        let history = compute_history(vec![
            video("live", day(2), "P0D"),
            video("a", day(1), "PT1M"),
            video("broken", day(3), "nonsense"),
            video("b", day(4), "PT3M"),
        ]);

        assert_eq!(history.len(), 2);
        assert!(!history.contains("live"));
        assert!(!history.contains("broken"));
        assert_eq!(means(&history), vec![60.0, 120.0]);
    }

    #[test]
    fn result_is_independent_of_order_and_duplicates() {
        let base = vec![
            video("a", day(1), "PT7M13S"),
            video("b", day(2), "PT1H"),
            video("c", day(2), "PT33S"),
            video("d", day(5), "PT2M"),
        ];
        let expected = compute_history(base.clone());

        let mut reversed = base.clone();
        reversed.reverse();
        assert_eq!(compute_history(reversed), expected);

        let mut rotated = base.clone();
        rotated.rotate_left(2);
        rotated.push(base[1].clone());
        rotated.push(base[3].clone());
        assert_eq!(compute_history(rotated), expected);
    }

    #[test]
    fn first_occurrence_wins_for_duplicate_ids() {
        let mut changed = video("a", day(1), "PT2M");
        changed.title = "Renamed".to_string();
        let history = compute_history(vec![video("a", day(1), "PT1M"), changed]);

        assert_eq!(history.len(), 1);
        assert_eq!(history.records()[0].title, "Video a");
        assert_eq!(history.records()[0].duration_seconds, 60);
    }

    #[test]
    fn means_are_rounded_to_two_decimals() {
        let history = compute_history(vec![
            video("a", day(1), "PT1S"),
            video("b", day(2), "PT1S"),
            video("c", day(3), "PT2S"),
        ]);
        assert_eq!(means(&history), vec![1.0, 1.0, 1.33]);
    }

    #[test]
    fn appending_matches_weighted_mean() {
        let history = compute_history(vec![
            video("a", day(1), "PT7M13S"),
            video("b", day(2), "PT41M9S"),
            video("c", day(3), "PT3M"),
        ]);
        let old_mean = history.latest().unwrap().running_mean_seconds;
        let n = history.len() as f64;

        let appended = history.with_appended(VideoRecord {
            id: "d".to_string(),
            title: "Video d".to_string(),
            published_at: day(4),
            duration_seconds: 1234,
            running_mean_seconds: 0.0,
        });

        let expected = (old_mean * n + 1234.0) / (n + 1.0);
        let actual = appended.latest().unwrap().running_mean_seconds;
        assert!((actual - expected).abs() < 0.01, "{actual} vs {expected}");
    }

    #[test]
    fn valid_records_never_get_a_zero_mean() {
        let history = compute_history(vec![
            video("a", day(1), "PT1S"),
            video("b", day(2), "PT0S"),
            video("c", day(3), "PT1S"),
        ]);
        assert!(history
            .records()
            .iter()
            .all(|r| r.duration_seconds > 0 && r.running_mean_seconds > 0.0));
    }
}
