//! Boundary parsing of enrollment payloads and extraction of gradeable samples.
//!
//! Enrollment sources hand over loosely shaped JSON. Everything is validated
//! into [`EnrollmentRecord`] here, so the statistics code only ever sees
//! well-formed values.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{
    EnrollmentRecord, EnrollmentSnapshot, ExtractionCounts, GradeSample, StudentRef,
};

pub const MAX_GRADE: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("record {index}: expected an object")]
    NotAnObject { index: usize },

    #[error("record {index}: missing student id")]
    MissingStudentId { index: usize },

    #[error("record {index}: final grade {value} is not numeric")]
    InvalidGrade { index: usize, value: String },

    #[error("record {index}: belongs to section {found}, expected {expected}")]
    SectionMismatch {
        index: usize,
        expected: String,
        found: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnrollmentPayload {
    Bare(Vec<Value>),
    Envelope {
        #[serde(default)]
        success: Option<bool>,
        #[serde(default)]
        data: Option<Vec<Value>>,
        #[serde(default)]
        message: Option<String>,
    },
}

const STUDENT_ID_KEYS: [&str; 2] = ["studentId", "student_id"];
const DISPLAY_NAME_KEYS: [&str; 4] = [
    "studentDisplayName",
    "student_display_name",
    "studentName",
    "student_name",
];
const FINAL_GRADE_KEYS: [&str; 2] = ["finalGrade", "final_grade"];
const SECTION_ID_KEYS: [&str; 2] = ["sectionId", "section_id"];

#[derive(Debug, Default)]
pub struct ParsedRoster {
    pub records: Vec<EnrollmentRecord>,
    pub rejected: Vec<RecordError>,
}

impl ParsedRoster {
    pub fn into_snapshot(self) -> EnrollmentSnapshot {
        EnrollmentSnapshot {
            records: self.records,
            rejected: self.rejected.len(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub samples: Vec<GradeSample>,
    pub counts: ExtractionCounts,
}

/// Parses a data-source response body for one section.
///
/// Accepts a bare array or a `{ success, data, message }` envelope. A failed
/// or empty envelope means no data is available and yields `Ok(None)`.
pub fn parse_payload(
    body: &str,
    section_id: &str,
) -> Result<Option<ParsedRoster>, serde_json::Error> {
    let items = match serde_json::from_str::<EnrollmentPayload>(body)? {
        EnrollmentPayload::Bare(items) => items,
        EnrollmentPayload::Envelope {
            success: Some(false),
            message,
            ..
        } => {
            tracing::warn!(
                section_id,
                message = message.as_deref().unwrap_or("none"),
                "enrollment source reported failure"
            );
            return Ok(None);
        }
        EnrollmentPayload::Envelope { data: None, .. } => return Ok(None),
        EnrollmentPayload::Envelope {
            data: Some(items), ..
        } => items,
    };

    let mut roster = ParsedRoster::default();
    for (index, item) in items.into_iter().enumerate() {
        match validate_record(index, item, section_id) {
            Ok(record) => roster.records.push(record),
            Err(err) => roster.rejected.push(err),
        }
    }

    Ok(Some(roster))
}

fn validate_record(
    index: usize,
    item: Value,
    section_id: &str,
) -> Result<EnrollmentRecord, RecordError> {
    let Value::Object(fields) = item else {
        return Err(RecordError::NotAnObject { index });
    };

    let student_id = first_present(&fields, &STUDENT_ID_KEYS)
        .and_then(id_text)
        .ok_or(RecordError::MissingStudentId { index })?;

    let final_grade = match first_present(&fields, &FINAL_GRADE_KEYS) {
        None => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse::<f64>().map_err(|_| {
            RecordError::InvalidGrade {
                index,
                value: s.clone(),
            }
        })?),
        Some(other) => {
            return Err(RecordError::InvalidGrade {
                index,
                value: other.to_string(),
            })
        }
    };

    let record_section = match first_present(&fields, &SECTION_ID_KEYS).and_then(id_text) {
        Some(found) if found != section_id => {
            return Err(RecordError::SectionMismatch {
                index,
                expected: section_id.to_string(),
                found,
            })
        }
        _ => section_id.to_string(),
    };

    let student_display_name = first_present(&fields, &DISPLAY_NAME_KEYS)
        .and_then(id_text)
        .unwrap_or_else(|| student_id.clone());

    Ok(EnrollmentRecord {
        student_id,
        student_display_name,
        final_grade,
        section_id: record_section,
    })
}

// First non-null value among the accepted spellings of a field.
fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Keeps records carrying a usable final grade, in input order.
///
/// A missing grade or a grade of exactly zero counts as ungraded. Grades
/// outside 0–100 are dropped and counted for the caller to report.
pub fn extract_samples(records: &[EnrollmentRecord]) -> Extraction {
    let mut extraction = Extraction {
        samples: Vec::with_capacity(records.len()),
        counts: ExtractionCounts {
            total: records.len(),
            ..ExtractionCounts::default()
        },
    };

    for record in records {
        match record.final_grade {
            None => extraction.counts.ungraded += 1,
            Some(grade) if grade == 0.0 => extraction.counts.ungraded += 1,
            Some(grade) if !grade.is_finite() || !(0.0..=MAX_GRADE).contains(&grade) => {
                extraction.counts.out_of_range += 1;
            }
            Some(grade) => extraction.samples.push(GradeSample {
                student: StudentRef {
                    student_id: record.student_id.clone(),
                    display_name: record.student_display_name.clone(),
                },
                grade,
            }),
        }
    }

    extraction.counts.graded = extraction.samples.len();
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, grade: Option<f64>) -> EnrollmentRecord {
        EnrollmentRecord {
            student_id: id.to_string(),
            student_display_name: format!("Student {id}"),
            final_grade: grade,
            section_id: "SEC-101".to_string(),
        }
    }

    #[test]
    fn zero_and_missing_grades_are_ungraded() {
        let records = vec![
            record("a", Some(0.0)),
            record("b", None),
            record("c", Some(72.0)),
        ];
        let extraction = extract_samples(&records);
        assert_eq!(extraction.samples.len(), 1);
        assert_eq!(extraction.samples[0].student.student_id, "c");
        assert_eq!(extraction.counts.ungraded, 2);
        assert_eq!(extraction.counts.graded, 1);
        assert_eq!(extraction.counts.total, 3);
    }

    #[test]
    fn out_of_range_grades_are_dropped() {
        let records = vec![
            record("a", Some(-5.0)),
            record("b", Some(100.5)),
            record("c", Some(f64::NAN)),
            record("d", Some(100.0)),
        ];
        let extraction = extract_samples(&records);
        assert_eq!(extraction.counts.out_of_range, 3);
        assert_eq!(extraction.samples.len(), 1);
        assert_eq!(extraction.samples[0].grade, 100.0);
    }

    #[test]
    fn extraction_preserves_input_order() {
        let records = vec![record("z", Some(90.0)), record("a", Some(40.0))];
        let extraction = extract_samples(&records);
        let ids: Vec<&str> = extraction
            .samples
            .iter()
            .map(|s| s.student.student_id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn parses_bare_array() {
        let body = r#"[
            {"studentId": "s1", "studentDisplayName": "Avery Lee", "finalGrade": 88, "sectionId": "SEC-101"},
            {"student_id": 42, "student_name": "Jules Moreno", "final_grade": "71.5"}
        ]"#;
        let roster = parse_payload(body, "SEC-101").unwrap().unwrap();
        assert!(roster.rejected.is_empty());
        assert_eq!(roster.records.len(), 2);
        assert_eq!(roster.records[0].student_display_name, "Avery Lee");
        assert_eq!(roster.records[1].student_id, "42");
        assert_eq!(roster.records[1].final_grade, Some(71.5));
        assert_eq!(roster.records[1].section_id, "SEC-101");
    }

    #[test]
    fn parses_success_envelope() {
        let body = r#"{"success": true, "data": [{"studentId": "s1", "finalGrade": null}]}"#;
        let roster = parse_payload(body, "SEC-101").unwrap().unwrap();
        assert_eq!(roster.records.len(), 1);
        assert_eq!(roster.records[0].final_grade, None);
        assert_eq!(roster.records[0].student_display_name, "s1");
    }

    #[test]
    fn failed_envelope_means_no_data() {
        let body = r#"{"success": false, "message": "section not found"}"#;
        assert!(parse_payload(body, "SEC-101").unwrap().is_none());
        assert!(parse_payload("{}", "SEC-101").unwrap().is_none());
    }

    #[test]
    fn malformed_records_are_rejected_at_the_boundary() {
        let body = r#"[
            "not a record",
            {"studentDisplayName": "No Id", "finalGrade": 80},
            {"studentId": "s3", "finalGrade": "eighty"},
            {"studentId": "s4", "finalGrade": 80, "sectionId": "SEC-999"},
            {"studentId": "s5", "finalGrade": 80}
        ]"#;
        let roster = parse_payload(body, "SEC-101").unwrap().unwrap();
        assert_eq!(roster.records.len(), 1);
        assert_eq!(roster.records[0].student_id, "s5");
        assert_eq!(
            roster.rejected,
            vec![
                RecordError::NotAnObject { index: 0 },
                RecordError::MissingStudentId { index: 1 },
                RecordError::InvalidGrade {
                    index: 2,
                    value: "eighty".to_string()
                },
                RecordError::SectionMismatch {
                    index: 3,
                    expected: "SEC-101".to_string(),
                    found: "SEC-999".to_string()
                },
            ]
        );
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_payload("not json", "SEC-101").is_err());
    }

    #[test]
    fn both_field_spellings_keep_the_record() {
        let body = r#"[
            {"studentId": "s1", "student_id": "s1", "finalGrade": 80, "final_grade": 80}
        ]"#;
        let roster = parse_payload(body, "SEC-101").unwrap().unwrap();
        assert!(roster.rejected.is_empty());
        assert_eq!(roster.records.len(), 1);
        assert_eq!(roster.records[0].final_grade, Some(80.0));
    }

    #[test]
    fn camel_case_spelling_wins_when_both_are_set() {
        let body = r#"[{"studentId": "s1", "finalGrade": 82, "final_grade": 40}]"#;
        let roster = parse_payload(body, "SEC-101").unwrap().unwrap();
        assert_eq!(roster.records[0].final_grade, Some(82.0));

        let body = r#"[{"studentId": "s1", "finalGrade": null, "final_grade": 40}]"#;
        let roster = parse_payload(body, "SEC-101").unwrap().unwrap();
        assert_eq!(roster.records[0].final_grade, Some(40.0));
    }

    #[test]
    fn non_string_display_name_keeps_the_grade() {
        let body = r#"[
            {"studentId": "s1", "studentDisplayName": 12345, "finalGrade": 77},
            {"studentId": "s2", "studentDisplayName": {"first": "Ana"}, "finalGrade": 64}
        ]"#;
        let roster = parse_payload(body, "SEC-101").unwrap().unwrap();
        assert!(roster.rejected.is_empty());
        assert_eq!(roster.records[0].student_display_name, "12345");
        assert_eq!(roster.records[1].student_display_name, "s2");
        assert_eq!(roster.records[1].final_grade, Some(64.0));
    }

    #[test]
    fn snapshot_carries_rejected_count() {
        let body = r#"[{"studentId": "s1", "finalGrade": 80}, {"finalGrade": 70}]"#;
        let snapshot = parse_payload(body, "SEC-101").unwrap().unwrap().into_snapshot();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.rejected, 1);
    }
}
