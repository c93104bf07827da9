//! Client for the academic REST backend that owns enrollment data.

use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::{StatusCode, Url};

use crate::grades::parse_payload;
use crate::models::EnrollmentSnapshot;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EnrollmentApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl EnrollmentApi {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid enrollment API url {base_url}"))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn enrollments_url(&self, section_id: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("enrollment API url {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(["sections", section_id, "enrollments"]);
        Ok(url)
    }

    /// All enrollments for a section, or `None` when the backend has nothing for it.
    pub async fn fetch_enrollments(
        &self,
        section_id: &str,
    ) -> anyhow::Result<Option<EnrollmentSnapshot>> {
        let url = self.enrollments_url(section_id)?;
        tracing::debug!(%url, "fetching enrollments");

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("failed to reach enrollment API at {url}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::warn!(section_id, "enrollment API has no such section");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(anyhow!("enrollment API returned {status} for section {section_id}"));
        }

        let body = response
            .text()
            .await
            .context("failed to read enrollment API response")?;
        let Some(roster) = parse_payload(&body, section_id)
            .context("enrollment API returned malformed JSON")?
        else {
            return Ok(None);
        };

        for rejected in &roster.rejected {
            tracing::warn!(section_id, %rejected, "skipping enrollment record");
        }

        Ok(Some(roster.into_snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn fetches_enveloped_enrollments_with_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/sections/SEC-101/enrollments")
                    .header("authorization", "Bearer secret");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": [
                        {"studentId": "s1", "studentDisplayName": "Avery Lee", "finalGrade": 91},
                        {"studentId": "s2", "studentDisplayName": "Kiara Patel", "finalGrade": null},
                        {"studentDisplayName": "Nobody", "finalGrade": 70}
                    ]
                }));
            })
            .await;

        let api = EnrollmentApi::new(&server.url("/api/"), Some("secret".to_string())).unwrap();
        let snapshot = api.fetch_enrollments("SEC-101").await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[0].final_grade, Some(91.0));
        assert_eq!(snapshot.records[1].final_grade, None);
        assert_eq!(snapshot.rejected, 1);
    }

    #[tokio::test]
    async fn accepts_bare_collection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/sections/SEC-7/enrollments");
                then.status(200)
                    .json_body(json!([{"student_id": 9, "final_grade": 64.5}]));
            })
            .await;

        let api = EnrollmentApi::new(&server.base_url(), None).unwrap();
        let snapshot = api.fetch_enrollments("SEC-7").await.unwrap().unwrap();
        assert_eq!(snapshot.rejected, 0);
        assert_eq!(snapshot.records[0].student_id, "9");
        assert_eq!(snapshot.records[0].section_id, "SEC-7");
    }

    #[tokio::test]
    async fn missing_section_is_no_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/sections/NOPE/enrollments");
                then.status(404);
            })
            .await;

        let api = EnrollmentApi::new(&server.base_url(), None).unwrap();
        assert!(api.fetch_enrollments("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_errors_are_propagated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/sections/SEC-101/enrollments");
                then.status(503);
            })
            .await;

        let api = EnrollmentApi::new(&server.base_url(), None).unwrap();
        let err = api.fetch_enrollments("SEC-101").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(EnrollmentApi::new("not a url", None).is_err());
    }
}
