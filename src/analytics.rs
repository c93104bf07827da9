use chrono::Utc;

use crate::config::AnalyticsConfig;
use crate::distribution::bucketize;
use crate::grades::extract_samples;
use crate::models::{EnrollmentSnapshot, SectionAnalytics};
use crate::risk::select_at_risk;
use crate::stats::summarize;

/// One full analytics pass over a section snapshot.
///
/// `None` means the source had no data for the section; the result is the
/// zero-state with `data_available` unset. Records the source rejected count
/// towards the enrolled total but never towards statistics.
pub fn analyze(
    section_id: &str,
    snapshot: Option<&EnrollmentSnapshot>,
    config: &AnalyticsConfig,
) -> SectionAnalytics {
    let data_available = snapshot.is_some();
    let (records, rejected) = match snapshot {
        Some(snapshot) => (snapshot.records.as_slice(), snapshot.rejected),
        None => (Default::default(), 0),
    };

    let mut extraction = extract_samples(records);
    extraction.counts.rejected = rejected;
    extraction.counts.total += rejected;

    if rejected > 0 {
        tracing::warn!(section_id, count = rejected, "source rejected malformed records");
    }
    if extraction.counts.out_of_range > 0 {
        tracing::warn!(
            section_id,
            count = extraction.counts.out_of_range,
            "excluded grades outside 0-100"
        );
    }
    tracing::debug!(
        section_id,
        total = extraction.counts.total,
        graded = extraction.counts.graded,
        ungraded = extraction.counts.ungraded,
        "extracted grade samples"
    );

    let risk_threshold = config.risk_threshold();

    SectionAnalytics {
        section_id: section_id.to_string(),
        generated_at: Utc::now(),
        pass_threshold: config.pass_threshold,
        risk_threshold,
        data_available,
        extraction: extraction.counts,
        summary: summarize(&extraction.samples, config.pass_threshold),
        distribution: bucketize(&extraction.samples),
        at_risk: select_at_risk(&extraction.samples, risk_threshold),
    }
}
