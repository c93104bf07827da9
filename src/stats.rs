use crate::models::{Extreme, GradeSample, SummaryStatistics};

pub const DEFAULT_PASS_THRESHOLD: f64 = 60.0;

pub fn summarize(samples: &[GradeSample], pass_threshold: f64) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics {
            sample_count: 0,
            average: 0.0,
            median: 0.0,
            highest: None,
            lowest: None,
            pass_rate: 0,
            fail_rate: 0,
        };
    }

    let n = samples.len();
    let total: f64 = samples.iter().map(|s| s.grade).sum();
    let passing = samples.iter().filter(|s| s.grade >= pass_threshold).count();

    let highest_value = samples.iter().map(|s| s.grade).fold(f64::MIN, f64::max);
    let lowest_value = samples.iter().map(|s| s.grade).fold(f64::MAX, f64::min);

    SummaryStatistics {
        sample_count: n,
        average: round_one_decimal(total / n as f64),
        median: upper_median(samples),
        highest: first_with_grade(samples, highest_value),
        lowest: first_with_grade(samples, lowest_value),
        pass_rate: rounded_percent(passing, n),
        fail_rate: rounded_percent(n - passing, n),
    }
}

/// Element at index `n / 2` of the ascending sort; no averaging for even `n`.
pub fn upper_median(samples: &[GradeSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut grades: Vec<f64> = samples.iter().map(|s| s.grade).collect();
    grades.sort_by(f64::total_cmp);
    grades[grades.len() / 2]
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

// Ties go to the earliest sample in input order.
fn first_with_grade(samples: &[GradeSample], grade: f64) -> Option<Extreme> {
    samples.iter().find(|s| s.grade == grade).map(|s| Extreme {
        grade: s.grade,
        student: s.student.clone(),
    })
}
