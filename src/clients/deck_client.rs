/// 路演材料解析服务客户端
///
/// 请求 `{ url }`，响应 `{ content }`。服务在内部失败时返回空字符串，
/// 这里原样返回，不当作错误。
use crate::clients::http;
use crate::config::Config;
use crate::error::AppResult;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct DeckResponse {
    #[serde(default)]
    content: String,
}

/// 路演材料解析客户端
#[derive(Clone)]
pub struct DeckParserClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl DeckParserClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.deck_parser_api_url.clone(),
            api_key: config.service_api_key.clone(),
        }
    }

    /// 解析路演材料，返回提取出的文本
    pub async fn parse(&self, url: &str) -> AppResult<String> {
        let response: DeckResponse =
            http::post_json(&self.http, &self.endpoint, &self.api_key, &json!({ "url": url }))
                .await?;
        Ok(response.content)
    }
}
