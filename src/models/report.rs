//! 阶段产物与尽调报告

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 抓取阶段的产物
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub markdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

/// 竞品信息
///
/// 分析服务返回的字段不固定，除名称外原样保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    #[serde(flatten)]
    pub details: Map<String, JsonValue>,
}

/// 竞品分析阶段的产物
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorAnalysis {
    #[serde(default)]
    pub detailed_competitors: Vec<Competitor>,
}

/// 一家公司的尽调报告，条目完成时产出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDiligenceReport {
    pub entry_id: String,
    pub deal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub sector: String,
    pub geography: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_metadata: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_excerpt: Option<String>,
    pub competitors: Vec<Competitor>,
    pub generated_at: DateTime<Utc>,
}
