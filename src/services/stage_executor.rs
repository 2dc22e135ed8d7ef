//! 阶段执行器 - 业务能力层
//!
//! 只负责"执行一个阶段"能力：调用一次外部服务，并把成功 / 失败统一成 [`StageOutcome`]。
//!
//! ## 规则
//! - 每次执行最多一次网络调用，不在这一层重试
//! - 每个阶段有独立超时，超时的失败原因固定为 `timeout`
//! - 缺少可选输入（没有网站、没有路演材料）时直接返回 `Skipped`，不算失败
//! - 路演材料解析服务返回空字符串时照常成功
//! - 服务的 4xx 拒绝是终止性的阶段失败，不是超时

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::{http, CompetitorClient, CompetitorRequest, DeckParserClient, ScrapeClient};
use crate::config::{Config, StageTimeouts};
use crate::error::{ApiError, AppError, AppResult};
use crate::models::report::{CompetitorAnalysis, ScrapedPage};
use crate::models::stage::{StageData, StageFailure, StageKind, StageOutcome};
use crate::services::url_guard::normalize_public_url;
use crate::workflow::EntryContext;

/// 执行单个阶段
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, stage: StageKind, ctx: &EntryContext) -> StageOutcome;
}

/// 三个外部服务的调用能力
#[async_trait]
pub trait StageBackend: Send + Sync {
    async fn scrape(&self, url: &str) -> AppResult<ScrapedPage>;
    async fn parse_deck(&self, url: &str) -> AppResult<String>;
    async fn analyze(&self, request: &CompetitorRequest) -> AppResult<CompetitorAnalysis>;
}

/// 基于 HTTP 的外部服务集合
pub struct HttpBackend {
    scrape: ScrapeClient,
    deck: DeckParserClient,
    competitor: CompetitorClient,
}

impl HttpBackend {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = http::build_client()?;
        Ok(Self {
            scrape: ScrapeClient::new(client.clone(), config),
            deck: DeckParserClient::new(client.clone(), config),
            competitor: CompetitorClient::new(client, config),
        })
    }
}

#[async_trait]
impl StageBackend for HttpBackend {
    async fn scrape(&self, url: &str) -> AppResult<ScrapedPage> {
        self.scrape.scrape(url).await
    }

    async fn parse_deck(&self, url: &str) -> AppResult<String> {
        self.deck.parse(url).await
    }

    async fn analyze(&self, request: &CompetitorRequest) -> AppResult<CompetitorAnalysis> {
        self.competitor.analyze(request).await
    }
}

/// 流水线阶段执行器
///
/// 职责：
/// - 决定阶段是否可以跳过
/// - 检查 URL
/// - 限定每个阶段的时间
/// - 把服务错误归类为 [`StageFailure`]
pub struct PipelineStageExecutor<B> {
    backend: B,
    timeouts: StageTimeouts,
}

impl<B: StageBackend> PipelineStageExecutor<B> {
    pub fn new(backend: B, timeouts: StageTimeouts) -> Self {
        Self { backend, timeouts }
    }

    async fn run_stage(
        &self,
        stage: StageKind,
        ctx: &EntryContext,
    ) -> Result<StageData, StageFailure> {
        match stage {
            StageKind::Scrape => {
                let Some(raw) = ctx.input.website.as_deref() else {
                    debug!("{} 没有网站地址，跳过抓取", ctx);
                    return Ok(StageData::Skipped);
                };
                let url = normalize_public_url(raw).map_err(StageFailure::rejected)?;
                self.bounded(stage, self.backend.scrape(&url))
                    .await
                    .map(StageData::Scraped)
            }
            StageKind::ParseDeck => {
                let Some(raw) = ctx.input.pitch_deck_url.as_deref() else {
                    debug!("{} 没有路演材料，跳过解析", ctx);
                    return Ok(StageData::Skipped);
                };
                let url = normalize_public_url(raw).map_err(StageFailure::rejected)?;
                self.bounded(stage, self.backend.parse_deck(&url))
                    .await
                    .map(StageData::Deck)
            }
            StageKind::Analyze => {
                let request = ctx.competitor_request();
                self.bounded(stage, self.backend.analyze(&request))
                    .await
                    .map(StageData::Analysis)
            }
        }
    }

    async fn bounded<T>(
        &self,
        stage: StageKind,
        call: impl Future<Output = AppResult<T>>,
    ) -> Result<T, StageFailure> {
        match tokio::time::timeout(self.timeouts.for_stage(stage), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(failure_from_error(e)),
            Err(_) => Err(StageFailure::timeout()),
        }
    }
}

#[async_trait]
impl<B: StageBackend> StageExecutor for PipelineStageExecutor<B> {
    async fn execute(&self, stage: StageKind, ctx: &EntryContext) -> StageOutcome {
        debug!("{} 执行阶段 {}", ctx, stage);
        let result = self.run_stage(stage, ctx).await;
        if let Err(failure) = &result {
            warn!("{} 阶段 {} 失败: {}", ctx, stage, failure);
        }
        result.into()
    }
}

/// 把服务错误归类为阶段失败
pub fn failure_from_error(err: AppError) -> StageFailure {
    match err {
        AppError::Api(ApiError::Timeout { .. }) => StageFailure::timeout(),
        AppError::Api(ApiError::Rejected { message, .. }) => StageFailure::rejected(message),
        AppError::Api(ApiError::BadResponse {
            status, message, ..
        }) => StageFailure::upstream(http::non_blank(message).unwrap_or_else(|| match status {
            Some(code) => format!("service returned status {}", code),
            None => "service reported a failure".to_string(),
        })),
        AppError::Api(ApiError::RequestFailed { source, .. }) => {
            StageFailure::transport(source.to_string())
        }
        AppError::Api(ApiError::JsonParseFailed { source }) => {
            StageFailure::invalid(format!("invalid response: {}", source))
        }
        other => StageFailure::upstream(other.to_string()),
    }
}
