//! 条目处理上下文
//!
//! 封装"我正在处理第几家公司"以及前面各阶段累积下来的产物

use std::fmt::Display;

use chrono::Utc;

use crate::clients::CompetitorRequest;
use crate::models::report::{CompetitorAnalysis, DueDiligenceReport, ScrapedPage};
use crate::models::stage::StageData;
use crate::models::startup::StartupInput;

/// 描述回退时截取的最大字符数
const DESCRIPTION_EXCERPT_CHARS: usize = 2000;
/// 报告中保留的路演材料摘录长度
const DECK_EXCERPT_CHARS: usize = 1000;

/// 条目处理上下文
#[derive(Debug, Clone)]
pub struct EntryContext {
    /// 条目ID
    pub entry_id: String,

    /// 条目在提交列表中的位置（从1开始，仅用于日志显示）
    pub entry_index: usize,

    /// 原始输入
    pub input: StartupInput,

    pub scraped: Option<ScrapedPage>,
    pub deck_content: Option<String>,
    pub analysis: Option<CompetitorAnalysis>,
}

impl EntryContext {
    pub fn new(entry_id: String, entry_index: usize, input: StartupInput) -> Self {
        Self {
            entry_id,
            entry_index,
            input,
            scraped: None,
            deck_content: None,
            analysis: None,
        }
    }

    /// 吸收一个阶段的产物
    pub fn absorb(&mut self, data: StageData) {
        match data {
            StageData::Skipped => {}
            StageData::Scraped(page) => self.scraped = Some(page),
            StageData::Deck(content) => self.deck_content = Some(content),
            StageData::Analysis(analysis) => self.analysis = Some(analysis),
        }
    }

    /// 用于竞品分析的描述
    ///
    /// 优先使用输入中的描述，其次是抓取到的网页内容，再次是路演材料
    pub fn description(&self) -> String {
        if let Some(description) = &self.input.description {
            return description.clone();
        }

        let scraped = self.scraped.as_ref().map(|p| p.markdown.as_str());
        let deck = self.deck_content.as_deref();

        [scraped, deck]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(|text| excerpt(text, DESCRIPTION_EXCERPT_CHARS))
            .unwrap_or_default()
    }

    /// 构建竞品分析请求
    pub fn competitor_request(&self) -> CompetitorRequest {
        CompetitorRequest {
            deal_name: self.input.name.clone(),
            sector: self.input.sector.clone(),
            geography: self.input.geography.clone(),
            description: self.description(),
            existing_competitors: self.input.existing_competitors.clone(),
        }
    }

    /// 汇总成尽调报告；没有分析结果时返回 None
    pub fn build_report(&self) -> Option<DueDiligenceReport> {
        let analysis = self.analysis.as_ref()?;

        Some(DueDiligenceReport {
            entry_id: self.entry_id.clone(),
            deal_name: self.input.name.clone(),
            website: self.input.website.clone(),
            sector: self.input.sector.clone(),
            geography: self.input.geography.clone(),
            description: self.description(),
            website_metadata: self.scraped.as_ref().and_then(|p| p.metadata.clone()),
            deck_excerpt: self
                .deck_content
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| excerpt(c, DECK_EXCERPT_CHARS)),
            competitors: analysis.detailed_competitors.clone(),
            generated_at: Utc::now(),
        })
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl Display for EntryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[条目 #{} {}]", self.entry_index, self.input.name)
    }
}
