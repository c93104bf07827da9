use crate::grades::MAX_GRADE;
use crate::models::{DistributionBucket, GradeSample};
use crate::stats::rounded_percent;

/// Letter bands in display order, as `(label, lower bound)`.
///
/// | Range       | Grade |
/// |-------------|-------|
/// | >= 90       | A+    |
/// | >= 85       | A     |
/// | >= 80       | B+    |
/// | >= 75       | B     |
/// | >= 70       | C+    |
/// | >= 65       | C     |
/// | >= 60       | D     |
/// | < 60        | F     |
pub const LETTER_BANDS: [(&str, f64); 8] = [
    ("A+", 90.0),
    ("A", 85.0),
    ("B+", 80.0),
    ("B", 75.0),
    ("C+", 70.0),
    ("C", 65.0),
    ("D", 60.0),
    ("F", 0.0),
];

/// Index into [`LETTER_BANDS`] for a grade. Anything below the last
/// positive bound falls through to F.
pub fn band_index(grade: f64) -> usize {
    LETTER_BANDS
        .iter()
        .position(|(_, lower)| grade >= *lower)
        .unwrap_or(LETTER_BANDS.len() - 1)
}

pub fn letter_grade(grade: f64) -> &'static str {
    LETTER_BANDS[band_index(grade)].0
}

pub fn bucketize(samples: &[GradeSample]) -> Vec<DistributionBucket> {
    let mut counts = [0usize; LETTER_BANDS.len()];
    for sample in samples {
        counts[band_index(sample.grade)] += 1;
    }

    LETTER_BANDS
        .iter()
        .enumerate()
        .map(|(i, (label, lower))| {
            let upper = if i == 0 { MAX_GRADE } else { LETTER_BANDS[i - 1].1 };
            DistributionBucket {
                label: *label,
                min_grade: *lower,
                max_grade: upper,
                count: counts[i],
                percentage: rounded_percent(counts[i], samples.len()),
            }
        })
        .collect()
}
