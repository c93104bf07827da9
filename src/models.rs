use chrono::{DateTime, Utc};
use serde::Serialize;

/// One student's enrollment in one section, as handed over by an enrollment source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRecord {
    pub student_id: String,
    pub student_display_name: String,
    pub final_grade: Option<f64>,
    pub section_id: String,
}

/// Records returned by a source for one section, plus how many it had to
/// reject while parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentSnapshot {
    pub records: Vec<EnrollmentRecord>,
    pub rejected: usize,
}

impl From<Vec<EnrollmentRecord>> for EnrollmentSnapshot {
    fn from(records: Vec<EnrollmentRecord>) -> Self {
        Self {
            records,
            rejected: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRef {
    pub student_id: String,
    pub display_name: String,
}

/// A validated final grade, strictly above zero and at most 100.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSample {
    pub student: StudentRef,
    pub grade: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extreme {
    pub grade: f64,
    pub student: StudentRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub sample_count: usize,
    pub average: f64,
    pub median: f64,
    pub highest: Option<Extreme>,
    pub lowest: Option<Extreme>,
    pub pass_rate: u32,
    pub fail_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBucket {
    pub label: &'static str,
    pub min_grade: f64,
    pub max_grade: f64,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskEntry {
    pub student_id: String,
    pub display_name: String,
    pub grade: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionCounts {
    pub total: usize,
    pub graded: usize,
    pub ungraded: usize,
    pub out_of_range: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionAnalytics {
    pub section_id: String,
    pub generated_at: DateTime<Utc>,
    pub pass_threshold: f64,
    pub risk_threshold: f64,
    pub data_available: bool,
    pub extraction: ExtractionCounts,
    pub summary: SummaryStatistics,
    pub distribution: Vec<DistributionBucket>,
    pub at_risk: Vec<AtRiskEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachRequest {
    pub section_id: String,
    pub student_ids: Vec<String>,
    pub message_template: String,
}
