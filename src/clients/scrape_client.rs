/// 网站抓取服务客户端
///
/// 请求 `{ url }`，响应 `{ success, markdown?, metadata?, error? }`
use crate::clients::http;
use crate::config::Config;
use crate::error::{ApiError, AppResult};
use crate::models::report::ScrapedPage;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    success: bool,
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<JsonValue>,
    #[serde(default)]
    error: Option<String>,
}

/// 抓取服务客户端
#[derive(Clone)]
pub struct ScrapeClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ScrapeClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.scrape_api_url.clone(),
            api_key: config.service_api_key.clone(),
        }
    }

    /// 抓取网页
    ///
    /// # 参数
    /// - `url`: 已规范化的网站地址
    ///
    /// # 返回
    /// 返回网页 markdown 和元数据；内容为空不算失败
    pub async fn scrape(&self, url: &str) -> AppResult<ScrapedPage> {
        let response: ScrapeResponse =
            http::post_json(&self.http, &self.endpoint, &self.api_key, &json!({ "url": url }))
                .await?;

        into_page(&self.endpoint, response)
    }
}

fn into_page(endpoint: &str, response: ScrapeResponse) -> AppResult<ScrapedPage> {
    if !response.success {
        return Err(ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            status: None,
            message: Some(
                http::non_blank(response.error).unwrap_or_else(|| "scrape failed".to_string()),
            ),
        }
        .into());
    }

    let page = ScrapedPage {
        markdown: response.markdown.unwrap_or_default(),
        metadata: response.metadata,
    };
    debug!("抓取完成，markdown {} 字符", page.markdown.chars().count());
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::stage_executor::failure_from_error;

    #[test]
    fn test_unsuccessful_scrape_carries_service_error() {
        let response: ScrapeResponse =
            serde_json::from_str(r#"{"success":false,"error":"Failed to fetch page"}"#).unwrap();
        let err = into_page("scrape", response).unwrap_err();
        match err {
            AppError::Api(ApiError::BadResponse { message, .. }) => {
                assert_eq!(message.as_deref(), Some("Failed to fetch page"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_service_error_uses_fallback_reason() {
        let response: ScrapeResponse =
            serde_json::from_str(r#"{"success":false,"error":""}"#).unwrap();
        let failure = failure_from_error(into_page("scrape", response).unwrap_err());
        assert_eq!(failure.reason, "scrape failed");
    }

    #[test]
    fn test_successful_scrape_without_markdown_is_empty_page() {
        let response: ScrapeResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        let page = into_page("scrape", response).unwrap();
        assert!(page.markdown.is_empty());
        assert!(page.metadata.is_none());
    }
}
