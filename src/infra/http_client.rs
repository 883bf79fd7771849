use crate::app::ports::MarksApi;
use crate::error::ApiError;
use crate::types::{
    AcademicMisconduct, Class, Degree, EntityId, Mark, NewAcademicMisconduct, NewMark,
    NewPersonalCircumstance, NewStudent, PersonalCircumstance, Student,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// `MarksApi` over the REST service. Every request carries the bearer token.
pub struct ReqwestMarksApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ReqwestMarksApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Transport(format!("invalid API url '{}': {}", base_url, e)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Base URL extended with the given path segments, each percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::Unauthorized)?;
        Ok(req.bearer_auth(token))
    }

    async fn lookup<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>, ApiError> {
        let resp = self.authorized(req)?.send().await?;
        let status = resp.status();
        debug!("HTTP lookup response: status={}", status.as_u16());
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp).await?;
        Ok(Some(resp.json::<T>().await?))
    }

    async fn create<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.client.post(self.url(segments)).json(body);
        let resp = self.authorized(req)?.send().await?;
        debug!("HTTP create response: status={}", resp.status().as_u16());
        let resp = check_status(resp).await?;
        Ok(resp.json::<T>().await?)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl MarksApi for ReqwestMarksApi {
    fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    #[instrument(skip(self))]
    async fn get_class_by_code(&self, code: &str) -> Result<Option<Class>, ApiError> {
        self.lookup(self.client.get(self.url(&["classes", code]))).await
    }

    #[instrument(skip(self))]
    async fn get_student_by_reg_no(&self, reg_no: &str) -> Result<Option<Student>, ApiError> {
        self.lookup(self.client.get(self.url(&["students", reg_no]))).await
    }

    #[instrument(skip(self, student), fields(reg_no = %student.reg_no))]
    async fn create_student(&self, student: &NewStudent) -> Result<Student, ApiError> {
        self.create(&["students"], student).await
    }

    #[instrument(skip(self))]
    async fn get_degree_by_name(&self, name: &str) -> Result<Option<Degree>, ApiError> {
        self.lookup(self.client.get(self.url(&["degrees", name]))).await
    }

    #[instrument(skip(self))]
    async fn get_mark(&self, student_id: EntityId, class_id: EntityId) -> Result<Option<Mark>, ApiError> {
        let req = self
            .client
            .get(self.url(&["marks"]))
            .query(&[("student_id", student_id), ("class_id", class_id)]);
        self.lookup(req).await
    }

    #[instrument(skip(self, mark))]
    async fn create_mark(&self, mark: &NewMark) -> Result<Mark, ApiError> {
        self.create(&["marks"], mark).await
    }

    #[instrument(skip(self, record), fields(reg_no = %record.reg_no))]
    async fn create_personal_circumstance(
        &self,
        record: &NewPersonalCircumstance,
    ) -> Result<PersonalCircumstance, ApiError> {
        self.create(&["personal-circumstances"], record).await
    }

    #[instrument(skip(self, record), fields(reg_no = %record.reg_no))]
    async fn create_academic_misconduct(
        &self,
        record: &NewAcademicMisconduct,
    ) -> Result<AcademicMisconduct, ApiError> {
        self.create(&["academic-misconducts"], record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base: &str) -> ReqwestMarksApi {
        ReqwestMarksApi::new(base, Some("secret".into()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn url_segments_are_encoded_and_joined() {
        let api = client_for("http://localhost:8000/api/");
        assert_eq!(
            api.url(&["degrees", "Computer Science"]).as_str(),
            "http://localhost:8000/api/degrees/Computer%20Science"
        );
        let api = client_for("http://localhost:8000/api");
        assert_eq!(api.url(&["classes", "CS408"]).as_str(), "http://localhost:8000/api/classes/CS408");
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let api = ReqwestMarksApi::new("http://localhost", Some("  ".into()), Duration::from_secs(1)).unwrap();
        assert!(!api.has_credential());
    }

    #[tokio::test]
    async fn calls_without_token_fail_before_sending() {
        let api = ReqwestMarksApi::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        let err = api.get_class_by_code("CS408").await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            ReqwestMarksApi::new("not a url", None, Duration::from_secs(1)),
            Err(ApiError::Transport(_))
        ));
    }
}
