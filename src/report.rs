use std::fmt::Write;

use crate::distribution::letter_grade;
use crate::models::{Extreme, SectionAnalytics};

fn extreme_label(extreme: Option<&Extreme>) -> String {
    match extreme {
        Some(e) => format!("{:.1} ({})", e.grade, e.student.display_name),
        None => "Unknown".to_string(),
    }
}

pub fn summary_lines(analytics: &SectionAnalytics) -> Vec<String> {
    let summary = &analytics.summary;
    vec![
        format!(
            "Graded students: {} of {} enrolled",
            summary.sample_count, analytics.extraction.total
        ),
        format!("Average: {:.1}", summary.average),
        format!("Median: {:.1}", summary.median),
        format!("Highest: {}", extreme_label(summary.highest.as_ref())),
        format!("Lowest: {}", extreme_label(summary.lowest.as_ref())),
        format!(
            "Pass rate: {}% (>= {}), fail rate: {}%",
            summary.pass_rate, analytics.pass_threshold, summary.fail_rate
        ),
    ]
}

pub fn build_report(analytics: &SectionAnalytics) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Section Grade Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        analytics.section_id,
        analytics.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);

    if !analytics.data_available {
        let _ = writeln!(output, "No enrollment data available for this section.");
        return output;
    }

    let _ = writeln!(output, "## Summary");
    for line in summary_lines(analytics) {
        let _ = writeln!(output, "- {line}");
    }
    if analytics.extraction.out_of_range > 0 {
        let _ = writeln!(
            output,
            "- Excluded {} grades outside 0-100",
            analytics.extraction.out_of_range
        );
    }
    if analytics.extraction.rejected > 0 {
        let _ = writeln!(
            output,
            "- Rejected {} malformed enrollment records",
            analytics.extraction.rejected
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    let _ = writeln!(output, "| Grade | Range | Students | Share |");
    let _ = writeln!(output, "|-------|-------|----------|-------|");
    for bucket in &analytics.distribution {
        let _ = writeln!(
            output,
            "| {} | {}-{} | {} | {}% |",
            bucket.label, bucket.min_grade, bucket.max_grade, bucket.count, bucket.percentage
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## At-Risk Students (below {})",
        analytics.risk_threshold
    );

    if analytics.at_risk.is_empty() {
        let _ = writeln!(output, "No students below the risk threshold.");
    } else {
        for entry in &analytics.at_risk {
            let _ = writeln!(
                output,
                "- {} ({}) grade {:.1} ({})",
                entry.display_name,
                entry.student_id,
                entry.grade,
                letter_grade(entry.grade)
            );
        }
    }

    output
}
