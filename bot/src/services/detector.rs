use crate::models::{History, NewVideoDiff, VideoRecord};

/// Decides whether `fetched` contains an upload that `stored` does not know yet.
///
/// Only videos published no earlier than the newest stored one count, so a
/// late backfill of an old upload is never reported as new. A fetch whose
/// newest video is older than what is stored is treated as stale and yields
/// nothing. When several uploads are new, the earliest one is returned and the
/// rest are left for the following cycles.
pub fn detect_difference(stored: &History, fetched: &History) -> Option<NewVideoDiff> {
    let fetched_latest = fetched.latest()?;

    if stored.same_as(fetched) {
        return None;
    }

    let stored_latest = stored.latest();
    if let Some(stored_latest) = stored_latest {
        if fetched_latest.published_at < stored_latest.published_at {
            return None;
        }
    }

    let mut candidates: Vec<&VideoRecord> = fetched
        .records()
        .iter()
        .filter(|record| !stored.contains(&record.id))
        .filter(|record| match stored_latest {
            Some(latest) => record.published_at >= latest.published_at,
            None => true,
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.published_at
            .cmp(&b.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let candidate = candidates.first()?;
    Some(NewVideoDiff {
        candidate: (*candidate).clone(),
        pending: candidates.len() - 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::statistics::compute_history;
    use crate::services::statistics::tests::{day, video};

    fn five_videos() -> History {
        compute_history(vec![
            video("a", day(1), "PT10M"),
            video("b", day(2), "PT12M"),
            video("c", day(3), "PT8M"),
            video("d", day(4), "PT30M"),
            video("e", day(5), "PT1H"),
        ])
    }

    #[test]
    fn identical_histories_have_no_difference() {
        let stored = five_videos();
        assert_eq!(detect_difference(&stored, &stored.clone()), None);
        assert_eq!(detect_difference(&History::default(), &History::default()), None);
    }

    #[test]
    fn detects_a_single_new_upload() {
        let stored = five_videos();
        let fetched = compute_history(vec![
            video("a", day(1), "PT10M"),
            video("b", day(2), "PT12M"),
            video("c", day(3), "PT8M"),
            video("d", day(4), "PT30M"),
            video("e", day(5), "PT1H"),
            video("f", day(6), "PT5M"),
        ]);

        let diff = detect_difference(&stored, &fetched).expect("new video");
        assert_eq!(diff.candidate.id, "f");
        assert_eq!(diff.pending, 0);
    }

    #[test]
    fn stale_fetch_is_not_an_update() {
        let stored = five_videos();
        let fetched = compute_history(vec![
            video("a", day(1), "PT10M"),
            video("b", day(2), "PT12M"),
            video("x", day(3), "PT2M"),
        ]);
        assert_eq!(detect_difference(&stored, &fetched), None);
    }

    #[test]
    fn backfilled_old_upload_is_ignored() {
        let stored = five_videos();
        let mut videos = vec![
            video("a", day(1), "PT10M"),
            video("b", day(2), "PT12M"),
            video("c", day(3), "PT8M"),
            video("d", day(4), "PT30M"),
            video("e", day(5), "PT1H"),
        ];
        videos.push(video("old", day(2), "PT3M"));
        let fetched = compute_history(videos);

        assert_eq!(detect_difference(&stored, &fetched), None);
    }

    #[test]
    fn earliest_of_several_new_uploads_comes_first() {
        let stored = five_videos();
        let fetched = compute_history(vec![
            video("a", day(1), "PT10M"),
            video("b", day(2), "PT12M"),
            video("c", day(3), "PT8M"),
            video("d", day(4), "PT30M"),
            video("e", day(5), "PT1H"),
            video("h", day(8), "PT5M"),
            video("g", day(7), "PT5M"),
            video("z", day(7), "PT5M"),
        ]);

        let diff = detect_difference(&stored, &fetched).expect("new videos");
        assert_eq!(diff.candidate.id, "g");
        assert_eq!(diff.pending, 2);
    }

    #[test]
    fn same_timestamp_as_latest_still_counts() {
        let stored = five_videos();
        let fetched = compute_history(vec![
            video("a", day(1), "PT10M"),
            video("b", day(2), "PT12M"),
            video("c", day(3), "PT8M"),
            video("d", day(4), "PT30M"),
            video("e", day(5), "PT1H"),
            video("f", day(5), "PT1M"),
        ]);

        let diff = detect_difference(&stored, &fetched).expect("new video");
        assert_eq!(diff.candidate.id, "f");
    }

    #[test]
    fn everything_is_new_against_an_empty_store() {
        let fetched = five_videos();
        let diff = detect_difference(&History::default(), &fetched).expect("new video");
        assert_eq!(diff.candidate.id, "a");
        assert_eq!(diff.pending, 4);
    }

    #[test]
    fn empty_fetch_is_not_an_update() {
        assert_eq!(detect_difference(&five_videos(), &History::default()), None);
    }
}
