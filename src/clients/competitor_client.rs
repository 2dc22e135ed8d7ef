/// 竞品分析服务客户端
use crate::clients::http;
use crate::config::Config;
use crate::error::{ApiError, AppResult};
use crate::models::report::{CompetitorAnalysis, Competitor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 竞品分析请求
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorRequest {
    pub deal_name: String,
    pub sector: String,
    pub geography: String,
    pub description: String,
    pub existing_competitors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    #[serde(default)]
    detailed_competitors: Option<Vec<Competitor>>,
    #[serde(default)]
    error: Option<String>,
}

/// 竞品分析客户端
#[derive(Clone)]
pub struct CompetitorClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CompetitorClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.competitor_api_url.clone(),
            api_key: config.service_api_key.clone(),
        }
    }

    /// 请求竞品分析
    pub async fn analyze(&self, request: &CompetitorRequest) -> AppResult<CompetitorAnalysis> {
        debug!("竞品分析: {}", request.deal_name);
        let response: AnalyzeResponse =
            http::post_json(&self.http, &self.endpoint, &self.api_key, request).await?;

        into_analysis(&self.endpoint, response)
    }
}

fn into_analysis(endpoint: &str, response: AnalyzeResponse) -> AppResult<CompetitorAnalysis> {
    match (response.detailed_competitors, http::non_blank(response.error)) {
        (_, Some(error)) => Err(ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            status: None,
            message: Some(error),
        }
        .into()),
        (Some(detailed_competitors), None) => Ok(CompetitorAnalysis {
            detailed_competitors,
        }),
        (None, None) => Err(ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            status: None,
            message: Some("response has neither detailedCompetitors nor error".to_string()),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = CompetitorRequest {
            deal_name: "Acme".to_string(),
            sector: "Fintech".to_string(),
            geography: "EU".to_string(),
            description: "Payments".to_string(),
            existing_competitors: vec!["Globex".to_string()],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["dealName"], "Acme");
        assert_eq!(value["existingCompetitors"][0], "Globex");
    }

    #[test]
    fn test_error_body_wins() {
        let response: AnalyzeResponse =
            serde_json::from_str(r#"{"error":"quota exceeded"}"#).unwrap();
        let err = into_analysis("analyze", response).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_blank_error_is_treated_as_absent() {
        let response: AnalyzeResponse = serde_json::from_str(r#"{"error":""}"#).unwrap();
        let err = into_analysis("analyze", response).unwrap_err();
        let failure = crate::services::stage_executor::failure_from_error(err);
        assert_eq!(
            failure.reason,
            "response has neither detailedCompetitors nor error"
        );

        let response: AnalyzeResponse =
            serde_json::from_str(r#"{"error":" ","detailedCompetitors":[]}"#).unwrap();
        assert!(into_analysis("analyze", response).is_ok());
    }

    #[test]
    fn test_empty_competitor_list_is_valid() {
        let response: AnalyzeResponse =
            serde_json::from_str(r#"{"detailedCompetitors":[]}"#).unwrap();
        let analysis = into_analysis("analyze", response).unwrap();
        assert!(analysis.detailed_competitors.is_empty());
    }
}
