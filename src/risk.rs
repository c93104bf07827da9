use crate::models::{AtRiskEntry, GradeSample, OutreachRequest};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskPolicy {
    /// Anyone failing is at risk.
    PassThreshold,
    /// A separate concern line, usually below the pass mark.
    Custom(f64),
}

impl RiskPolicy {
    pub fn threshold(self, pass_threshold: f64) -> f64 {
        match self {
            RiskPolicy::PassThreshold => pass_threshold,
            RiskPolicy::Custom(value) => value,
        }
    }
}

/// Students strictly below `threshold`, lowest grade first.
pub fn select_at_risk(samples: &[GradeSample], threshold: f64) -> Vec<AtRiskEntry> {
    let mut entries: Vec<AtRiskEntry> = samples
        .iter()
        .filter(|s| s.grade < threshold)
        .map(|s| AtRiskEntry {
            student_id: s.student.student_id.clone(),
            display_name: s.student.display_name.clone(),
            grade: s.grade,
        })
        .collect();

    // sort_by is stable: equal grades keep roster order
    entries.sort_by(|a, b| a.grade.total_cmp(&b.grade));
    entries
}

/// Accepts outreach for at-risk students. Delivery belongs to the implementor.
pub trait Notifier {
    /// Returns how many notifications were accepted.
    async fn notify(&self, request: &OutreachRequest) -> anyhow::Result<usize>;
}

pub async fn notify_at_risk<N: Notifier>(
    notifier: &N,
    section_id: &str,
    entries: &[AtRiskEntry],
    message_template: &str,
) -> anyhow::Result<usize> {
    if entries.is_empty() {
        tracing::info!(section_id, "no at-risk students, skipping outreach");
        return Ok(0);
    }

    let request = OutreachRequest {
        section_id: section_id.to_string(),
        student_ids: entries.iter().map(|e| e.student_id.clone()).collect(),
        message_template: message_template.to_string(),
    };
    let accepted = notifier.notify(&request).await?;
    tracing::info!(
        section_id,
        requested = request.student_ids.len(),
        accepted,
        "outreach handed to notifier"
    );
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentRef;
    use std::sync::Mutex;

    fn sample(id: &str, grade: f64) -> GradeSample {
        GradeSample {
            student: StudentRef {
                student_id: id.to_string(),
                display_name: format!("Student {id}"),
            },
            grade,
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        requests: Mutex<Vec<OutreachRequest>>,
    }

    impl Notifier for RecordingNotifier {
        async fn notify(&self, request: &OutreachRequest) -> anyhow::Result<usize> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(request.student_ids.len())
        }
    }

    #[test]
    fn most_at_risk_students_come_first() {
        let samples = vec![
            sample("a", 58.0),
            sample("b", 91.0),
            sample("c", 45.0),
            sample("d", 60.0),
        ];
        let entries = select_at_risk(&samples, 60.0);
        let ids: Vec<&str> = entries.iter().map(|e| e.student_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(entries[0].grade, 45.0);
    }

    #[test]
    fn equal_grades_keep_roster_order() {
        let samples = vec![sample("x", 50.0), sample("y", 40.0), sample("z", 50.0)];
        let entries = select_at_risk(&samples, 60.0);
        let ids: Vec<&str> = entries.iter().map(|e| e.student_id.as_str()).collect();
        assert_eq!(ids, vec!["y", "x", "z"]);
    }

    #[test]
    fn custom_policy_uses_its_own_threshold() {
        assert_eq!(RiskPolicy::PassThreshold.threshold(60.0), 60.0);
        assert_eq!(RiskPolicy::Custom(50.0).threshold(60.0), 50.0);

        let samples = vec![sample("a", 45.0), sample("b", 55.0)];
        let entries = select_at_risk(&samples, RiskPolicy::Custom(50.0).threshold(60.0));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].student_id, "a");
    }

    #[tokio::test]
    async fn notifier_receives_at_risk_ids_in_order() {
        let notifier = RecordingNotifier::default();
        let entries = select_at_risk(&[sample("a", 58.0), sample("c", 45.0)], 60.0);

        let accepted = notify_at_risk(&notifier, "SEC-101", &entries, "Please book office hours")
            .await
            .unwrap();

        assert_eq!(accepted, 2);
        let requests = notifier.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].student_ids, vec!["c".to_string(), "a".to_string()]);
        assert_eq!(requests[0].section_id, "SEC-101");
        assert_eq!(requests[0].message_template, "Please book office hours");
    }

    #[tokio::test]
    async fn empty_list_does_not_call_notifier() {
        let notifier = RecordingNotifier::default();
        let accepted = notify_at_risk(&notifier, "SEC-101", &[], "hello").await.unwrap();
        assert_eq!(accepted, 0);
        assert!(notifier.requests.lock().unwrap().is_empty());
    }
}
