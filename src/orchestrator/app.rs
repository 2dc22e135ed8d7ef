//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写日志文件头、创建外部服务客户端和报告写入器
//! 2. **批量加载**：扫描输入目录，丢弃不合法的输入
//! 3. **运行批次**：交给 [`BatchOrchestrator`]，实时打印进度
//! 4. **失败重提**：按配置把失败的公司作为新条目重新提交
//! 5. **全局统计**：汇总所有轮次的结果
//!
//! Ctrl-C 会取消当前运行：未开始的条目保持 `pending`，进行中的条目冻结。

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::entry::EntryStatus;
use crate::models::startup::StartupInput;
use crate::models::load_all_startup_files;
use crate::orchestrator::batch_orchestrator::{BatchOrchestrator, BatchOutcome, BatchSummary};
use crate::orchestrator::progress::BatchSnapshot;
use crate::services::{
    FailureWriter, HttpBackend, PipelineStageExecutor, ReportSink, ReportWriter, StageExecutor,
};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    executor: Arc<dyn StageExecutor>,
    report_sink: Arc<dyn ReportSink>,
    failure_writer: FailureWriter,
    cancel: CancellationToken,
}

impl App {
    /// 初始化应用，使用 HTTP 外部服务
    pub fn initialize(config: Config) -> Result<Self> {
        let backend = HttpBackend::new(&config).context("无法创建 HTTP 客户端")?;
        let executor = PipelineStageExecutor::new(backend, config.stage_timeouts());
        Self::with_executor(config, Arc::new(executor))
    }

    /// 使用指定的阶段执行器初始化应用
    pub fn with_executor(config: Config, executor: Arc<dyn StageExecutor>) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(config.max_concurrent_entries, config.retry_failed_rounds);

        Ok(Self {
            report_sink: Arc::new(ReportWriter::new(&config.report_folder)),
            failure_writer: FailureWriter::with_path(&config.failure_file),
            executor,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// 取消信号，触发后当前运行停止接纳新条目
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 运行应用主逻辑
    ///
    /// # 返回
    /// 返回所有轮次汇总后的统计
    pub async fn run(&self) -> Result<BatchSummary> {
        let inputs = self.load_inputs().await?;

        if inputs.is_empty() {
            warn!("⚠️ 没有找到合法的输入，程序结束");
            return Ok(BatchSummary::default());
        }

        let ctrl_c = {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("⏹️ 收到 Ctrl-C，正在取消...");
                    cancel.cancel();
                }
            })
        };

        let result = self.run_rounds(inputs).await;
        ctrl_c.abort();

        let summary = result?;
        logging::print_final_stats(
            &summary,
            &self.config.output_log_file,
            &self.config.failure_file,
        );
        Ok(summary)
    }

    /// 加载输入并丢弃不合法的条目
    async fn load_inputs(&self) -> Result<Vec<StartupInput>> {
        info!("\n📁 正在扫描待处理的输入...");
        let raw = load_all_startup_files(&self.config.input_folder)
            .await
            .with_context(|| format!("无法加载输入目录 {}", self.config.input_folder))?;

        let total = raw.len();
        let inputs: Vec<StartupInput> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(i, input)| match input.validated(i + 1) {
                Ok(input) => Some(input),
                Err(e) => {
                    warn!("⚠️ 跳过输入: {}", e);
                    None
                }
            })
            .collect();

        logging::log_inputs_loaded(inputs.len(), total - inputs.len());
        Ok(inputs)
    }

    /// 首轮加上失败重提轮次
    async fn run_rounds(&self, inputs: Vec<StartupInput>) -> Result<BatchSummary> {
        let first = self.run_batch(inputs).await?;
        let mut summary = first.summary;
        let mut failed = first.failed_inputs();
        let mut cancelled = first.cancelled;

        let rounds = self.config.retry_failed_rounds;
        for round in 1..=rounds {
            if cancelled || failed.is_empty() {
                break;
            }
            logging::log_retry_round(round, rounds, failed.len());

            let outcome = self.run_batch(failed).await?;
            // 重提的条目替换上一轮的失败条目
            summary.complete += outcome.summary.complete;
            summary.error =
                summary.error.saturating_sub(outcome.summary.total) + outcome.summary.error;
            summary.cancelled += outcome.summary.cancelled;
            summary.pending += outcome.summary.pending;

            failed = outcome.failed_inputs();
            cancelled = outcome.cancelled;
        }

        Ok(summary)
    }

    async fn run_batch(&self, inputs: Vec<StartupInput>) -> Result<BatchOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = tokio::spawn(log_progress(rx));

        let outcome = BatchOrchestrator::new(
            self.executor.clone(),
            self.config.max_concurrent_entries,
        )
        .with_report_sink(self.report_sink.clone())
        .with_cancellation(self.cancel.clone())
        .with_snapshot_stream(tx)
        .run(inputs)
        .await
        .context("批次运行失败")?;

        let _ = reporter.await;
        self.record_failures(&outcome);
        Ok(outcome)
    }

    fn record_failures(&self, outcome: &BatchOutcome) {
        for entry in outcome
            .run
            .entries()
            .iter()
            .filter(|e| e.status() == EntryStatus::Error)
        {
            if let Err(e) = self.failure_writer.write(entry) {
                warn!("⚠️ 无法写入失败记录 {}: {}", entry.name(), e);
            }
        }
    }
}

/// 总进度变化时打印一行
async fn log_progress(mut rx: mpsc::UnboundedReceiver<BatchSnapshot>) {
    let mut last_progress = None;
    while let Some(snapshot) = rx.recv().await {
        if last_progress == Some(snapshot.overall_progress) {
            continue;
        }
        last_progress = Some(snapshot.overall_progress);

        let c = snapshot.counts;
        info!(
            "📈 总进度 {}% (完成 {} / 失败 {} / 进行中 {} / 等待 {})",
            snapshot.overall_progress, c.complete, c.error, c.active, c.pending
        );
    }
}
