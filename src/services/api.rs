//! Async client for the farm REST API
//!
//! Every method issues one request and maps the outcome into
//! [`HerdbookError::Network`] (transport or decoding failure) or
//! [`HerdbookError::Api`] (non-success status, message from the body).
//! There is no retry; callers notify and carry on.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{header, multipart, Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;

use crate::services::export::{file_name_from_disposition, ExportFormat};
use crate::services::loader::{records_from_value, ListRecord};
use crate::services::Config;
use crate::types::{
    Blog, BlogCategoryLink, Category, Cow, Created, HerdbookError, MilkingSession,
    NewMilkingSession, PasswordChange, Result, User, UserUpdate,
};

/// Fields of a blog post create/update form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    /// Local image uploaded as the `photo` part
    pub photo: Option<PathBuf>,
}

/// A downloaded export
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub bytes: Vec<u8>,
    /// Name suggested by the server, if any
    pub file_name: Option<String>,
}

#[derive(Serialize)]
struct CategoryBody<'a> {
    name: &'a str,
}

/// Farm API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HerdbookError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    /// Send and turn a non-success status into `HerdbookError::Api`
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = server_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
        log::warn!("server rejected request ({}): {}", status.as_u16(), message);
        Err(HerdbookError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json(&self, request: RequestBuilder) -> Result<Value> {
        let response = self.send(request).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| HerdbookError::Network(format!("invalid response body: {}", e)))
    }

    async fn list<T: ListRecord>(&self, path: &str) -> Result<Vec<T>> {
        let value = self.json(self.request(Method::GET, path)).await?;
        records_from_value(value)
    }

    /// `{message}` acknowledgement; an empty body is fine
    async fn acknowledge(&self, request: RequestBuilder) -> Result<String> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(server_message(&body).unwrap_or_else(|| "OK".to_string()))
    }

    // ========== milking sessions ==========

    pub async fn list_sessions(&self) -> Result<Vec<MilkingSession>> {
        self.list("/milk-production/milking-sessions").await
    }

    pub async fn create_session(&self, session: &NewMilkingSession) -> Result<Created> {
        let value = self
            .json(
                self.request(Method::POST, "/milk-production/milking-sessions")
                    .json(session),
            )
            .await?;
        serde_json::from_value(value)
            .map_err(|e| HerdbookError::Network(format!("invalid response body: {}", e)))
    }

    pub async fn update_session(&self, id: u64, session: &NewMilkingSession) -> Result<String> {
        let path = format!("/milk-production/milking-sessions/{}", id);
        self.acknowledge(self.request(Method::PUT, &path).json(session))
            .await
    }

    pub async fn delete_session(&self, id: u64) -> Result<String> {
        let path = format!("/milk-production/milking-sessions/{}", id);
        self.acknowledge(self.request(Method::DELETE, &path)).await
    }

    /// Server-side daily summaries; the shape is passed through untouched
    pub async fn daily_summaries(
        &self,
        cow_id: Option<u64>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Value> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(id) = cow_id {
            query.push(("cow_id", id.to_string()));
        }
        if let Some(d) = start {
            query.push(("start_date", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = end {
            query.push(("end_date", d.format("%Y-%m-%d").to_string()));
        }
        self.json(
            self.request(Method::GET, "/milk-production/daily-summaries")
                .query(&query),
        )
        .await
    }

    // ========== cattle ==========

    pub async fn list_cattle(&self) -> Result<Vec<Cow>> {
        self.list("/cattle/list").await
    }

    /// Cattle assigned to one farmer
    pub async fn farmer_cattle(&self, farmer_id: u64) -> Result<Vec<Cow>> {
        self.list(&format!("/cattle-distribution/farmer/{}", farmer_id))
            .await
    }

    // ========== blogs ==========

    pub async fn list_blogs(&self) -> Result<Vec<Blog>> {
        self.list("/blog/list").await
    }

    async fn blog_form(draft: &BlogDraft) -> Result<multipart::Form> {
        let mut form = multipart::Form::new()
            .text("title", draft.title.clone())
            .text("content", draft.content.clone());

        if let Some(path) = &draft.photo {
            let bytes = tokio::fs::read(path).await?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("photo")
                .to_string();
            form = form.part("photo", multipart::Part::bytes(bytes).file_name(name));
        }
        Ok(form)
    }

    pub async fn add_blog(&self, draft: &BlogDraft) -> Result<String> {
        let form = Self::blog_form(draft).await?;
        self.acknowledge(self.request(Method::POST, "/blog/add").multipart(form))
            .await
    }

    pub async fn update_blog(&self, id: u64, draft: &BlogDraft) -> Result<String> {
        let form = Self::blog_form(draft).await?;
        let path = format!("/blog/update/{}", id);
        self.acknowledge(self.request(Method::PUT, &path).multipart(form))
            .await
    }

    pub async fn delete_blog(&self, id: u64) -> Result<String> {
        let path = format!("/blog/delete/{}", id);
        self.acknowledge(self.request(Method::DELETE, &path)).await
    }

    // ========== categories ==========

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.list("/category/list").await
    }

    pub async fn add_category(&self, name: &str) -> Result<String> {
        self.acknowledge(
            self.request(Method::POST, "/category/add")
                .json(&CategoryBody { name }),
        )
        .await
    }

    pub async fn update_category(&self, id: u64, name: &str) -> Result<String> {
        let path = format!("/category/update/{}", id);
        self.acknowledge(self.request(Method::PUT, &path).json(&CategoryBody { name }))
            .await
    }

    pub async fn delete_category(&self, id: u64) -> Result<String> {
        let path = format!("/category/delete/{}", id);
        self.acknowledge(self.request(Method::DELETE, &path)).await
    }

    pub async fn assign_category(&self, link: BlogCategoryLink) -> Result<String> {
        self.acknowledge(
            self.request(Method::POST, "/blog-category/assign")
                .json(&link),
        )
        .await
    }

    pub async fn remove_category(&self, link: BlogCategoryLink) -> Result<String> {
        self.acknowledge(
            self.request(Method::DELETE, "/blog-category/remove")
                .json(&link),
        )
        .await
    }

    pub async fn blog_categories(&self, blog_id: u64) -> Result<Vec<Category>> {
        self.list(&format!("/blog-category/blog/{}/categories", blog_id))
            .await
    }

    // ========== users ==========

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.list("/user/list").await
    }

    pub async fn get_user(&self, id: u64) -> Result<User> {
        let value = self
            .json(self.request(Method::GET, &format!("/user/{}", id)))
            .await?;
        let record = match value {
            Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
                map.remove("user").unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(record)
            .map_err(|e| HerdbookError::Network(format!("invalid user record: {}", e)))
    }

    pub async fn edit_user(&self, id: u64, update: &UserUpdate) -> Result<String> {
        let path = format!("/user/edit/{}", id);
        self.acknowledge(self.request(Method::PUT, &path).json(update))
            .await
    }

    pub async fn delete_user(&self, id: u64) -> Result<String> {
        let path = format!("/user/delete/{}", id);
        self.acknowledge(self.request(Method::DELETE, &path)).await
    }

    pub async fn reset_password(&self, id: u64) -> Result<String> {
        let path = format!("/user/reset-password/{}", id);
        self.acknowledge(self.request(Method::POST, &path)).await
    }

    pub async fn change_password(&self, id: u64, change: &PasswordChange) -> Result<String> {
        let path = format!("/user/change-password/{}", id);
        self.acknowledge(self.request(Method::POST, &path).json(change))
            .await
    }

    // ========== exports ==========

    pub async fn download_export(&self, format: ExportFormat) -> Result<Download> {
        let response = self
            .send(self.request(Method::GET, format.endpoint()))
            .await?;
        let file_name = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(file_name_from_disposition);
        let bytes = response.bytes().await?.to_vec();
        Ok(Download { bytes, file_name })
    }

    // ========== fan-out ==========

    /// Blogs and categories fetched concurrently; fails if either fails
    pub async fn blogs_with_categories(&self) -> Result<(Vec<Blog>, Vec<Category>)> {
        tokio::try_join!(self.list_blogs(), self.list_categories())
    }

    /// Sessions and cattle fetched concurrently; fails if either fails
    pub async fn herd_snapshot(&self) -> Result<(Vec<MilkingSession>, Vec<Cow>)> {
        tokio::try_join!(self.list_sessions(), self.list_cattle())
    }
}

/// `message` or `error` string from a JSON body
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_prefers_message() {
        assert_eq!(
            server_message(r#"{"message": "Saved", "error": "x"}"#),
            Some("Saved".into())
        );
        assert_eq!(server_message(r#"{"error": "Bad id"}"#), Some("Bad id".into()));
    }

    #[test]
    fn test_server_message_missing() {
        assert_eq!(server_message(""), None);
        assert_eq!(server_message("<html>oops</html>"), None);
        assert_eq!(server_message(r#"{"message": "  "}"#), None);
        assert_eq!(server_message(r#"{"message": 5}"#), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://farm.test/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://farm.test/api");
    }
}
