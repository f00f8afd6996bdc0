use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use reqwest::Url;
use tracing::debug;

use super::{ActionResult, ApiResult, ChildrenResponse, KeywordApi, KeywordPageResponse, KeywordQuery};
use crate::config::CoreConfig;
use crate::error::KeywordError;
use crate::models::{ProcessingStatus, Project, ProjectStats};

/// `KeywordApi` over the project REST endpoints.
pub struct HttpKeywordApi {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpKeywordApi {
    pub fn new(config: &CoreConfig) -> ApiResult<Self> {
        let base = config.api_base_url.trim_end_matches('/');
        let base_url = Url::parse(base).map_err(|e| {
            KeywordError::invalid_input(format!("Invalid API base URL {}: {}", base, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(KeywordError::invalid_input(format!(
                "Invalid API base URL {}",
                base
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { base_url, client })
    }

    /// `{base}/api/{segments...}` with every segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn project_url(&self, project_id: i64, segments: &[&str]) -> Url {
        let id = project_id.to_string();
        let mut all = vec!["projects", id.as_str()];
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&'static str, String)],
    ) -> ApiResult<T> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).query(params).send().await?;
        read_json(response).await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> ApiResult<ActionResult> {
        debug!(url = %url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        read_json(response).await
    }

    async fn post_ids(
        &self,
        project_id: i64,
        action: &str,
        keyword_ids: &[i64],
        group_name: Option<&str>,
    ) -> ApiResult<ActionResult> {
        let mut body = json!({ "keywordIds": keyword_ids });
        if let Some(name) = group_name {
            body["groupName"] = json!(name);
        }
        self.post_json(self.project_url(project_id, &[action]), &body).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(KeywordError::Api {
            status: status.as_u16(),
            message: error_text,
        });
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl KeywordApi for HttpKeywordApi {
    async fn fetch_projects(&self) -> ApiResult<Vec<Project>> {
        self.get_json(self.endpoint(&["projects"]), &[]).await
    }

    async fn fetch_keywords_page(
        &self,
        project_id: i64,
        query: &KeywordQuery,
    ) -> ApiResult<KeywordPageResponse> {
        let url = self.project_url(project_id, &["keywords"]);
        self.get_json(url, &query.to_params()).await
    }

    async fn fetch_children_of_group(
        &self,
        project_id: i64,
        group_id: &str,
    ) -> ApiResult<ChildrenResponse> {
        let url = self.project_url(project_id, &["groups", group_id, "children"]);
        self.get_json(url, &[]).await
    }

    async fn fetch_project_stats(&self, project_id: i64) -> ApiResult<ProjectStats> {
        self.get_json(self.project_url(project_id, &["stats"]), &[]).await
    }

    async fn fetch_processing_status(&self, project_id: i64) -> ApiResult<ProcessingStatus> {
        self.get_json(self.project_url(project_id, &["processing-status"]), &[])
            .await
    }

    async fn group_keywords(
        &self,
        project_id: i64,
        keyword_ids: &[i64],
        group_name: &str,
    ) -> ApiResult<ActionResult> {
        self.post_ids(project_id, "group", keyword_ids, Some(group_name)).await
    }

    async fn regroup_keywords(
        &self,
        project_id: i64,
        keyword_ids: &[i64],
        group_name: &str,
    ) -> ApiResult<ActionResult> {
        self.post_ids(project_id, "regroup", keyword_ids, Some(group_name)).await
    }

    async fn ungroup_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult> {
        self.post_ids(project_id, "ungroup", keyword_ids, None).await
    }

    async fn confirm_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult> {
        self.post_ids(project_id, "confirm", keyword_ids, None).await
    }

    async fn unconfirm_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult> {
        self.post_ids(project_id, "unconfirm", keyword_ids, None).await
    }

    async fn unblock_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult> {
        self.post_ids(project_id, "unblock", keyword_ids, None).await
    }

    async fn block_token(&self, project_id: i64, token: &str) -> ApiResult<ActionResult> {
        let url = self.project_url(project_id, &["block-token"]);
        self.post_json(url, &json!({ "token": token })).await
    }
}
