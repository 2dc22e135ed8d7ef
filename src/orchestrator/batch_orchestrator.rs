//! 批量编排器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责把一次提交的所有条目跑完，是批次级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **提交校验**：非法输入在创建条目之前就被拒绝
//! 2. **并发控制**：使用 Semaphore 限制同时活跃的条目数，按提交顺序接纳
//! 3. **失败隔离**：单个条目失败只影响它自己
//! 4. **状态汇总**：唯一写入 [`BatchRun`] 的地方，每次迁移后发布快照
//! 5. **报告交付**：条目完成时把报告交给 [`ReportSink`]
//! 6. **取消**：待处理条目保持 `pending`，进行中的条目跑完当前阶段后冻结
//!
//! 每次运行创建一个新的编排器，不共享任何全局状态。

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult, ConfigError, InvariantViolation};
use crate::models::batch::BatchRun;
use crate::models::entry::{BatchEntry, EntryStatus};
use crate::models::startup::StartupInput;
use crate::orchestrator::progress::{BatchSnapshot, ProgressReporter};
use crate::services::{ReportSink, StageExecutor};
use crate::workflow::{EntryEvent, EntryStateMachine};

type EntryTask = JoinHandle<Result<BatchEntry, InvariantViolation>>;

/// 批量编排器
pub struct BatchOrchestrator {
    executor: Arc<dyn StageExecutor>,
    concurrency_limit: usize,
    report_sink: Option<Arc<dyn ReportSink>>,
    snapshot_stream: Option<mpsc::UnboundedSender<BatchSnapshot>>,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - `executor`: 阶段执行器
    /// - `concurrency_limit`: 同时活跃的条目上限，必须大于 0
    pub fn new(executor: Arc<dyn StageExecutor>, concurrency_limit: usize) -> Self {
        Self {
            executor,
            concurrency_limit,
            report_sink: None,
            snapshot_stream: None,
            cancel: CancellationToken::new(),
        }
    }

    /// 条目完成时把报告交给 `sink`
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    /// 使用外部的取消信号
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 除 watch 通道外，把每个快照按顺序发送到 `stream`
    pub fn with_snapshot_stream(mut self, stream: mpsc::UnboundedSender<BatchSnapshot>) -> Self {
        self.snapshot_stream = Some(stream);
        self
    }

    /// 校验输入并在后台开始运行，需要在 tokio 运行时内调用
    ///
    /// # 返回
    /// 返回运行句柄；任何输入不合法时整个提交被拒绝，不会创建条目
    pub fn start(self, inputs: Vec<StartupInput>) -> AppResult<BatchHandle> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency.into());
        }
        if inputs.is_empty() {
            return Err(crate::error::ValidationError::EmptyBatch.into());
        }

        let inputs = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| input.validated(i + 1))
            .collect::<Result<Vec<_>, _>>()?;

        let machines: Vec<EntryStateMachine> = inputs
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, input)| EntryStateMachine::new(i, input))
            .collect();

        let run = BatchRun::new(
            machines.iter().map(|m| m.entry().clone()).collect(),
            self.concurrency_limit,
        );

        let mut reporter = ProgressReporter::new();
        let initial = reporter.observe(&run).unwrap_or_default();
        if let Some(stream) = &self.snapshot_stream {
            let _ = stream.send(initial.clone());
        }
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        log_run_start(run.len(), run.concurrency_limit());

        let aggregator = Aggregator {
            run,
            reporter,
            admitted: HashSet::new(),
            snapshot_tx,
            snapshot_stream: self.snapshot_stream,
            report_sink: self.report_sink,
        };

        let cancel = self.cancel.clone();
        let task = tokio::spawn(drive(
            aggregator,
            machines,
            inputs,
            self.executor,
            self.concurrency_limit,
            self.cancel,
        ));

        Ok(BatchHandle {
            snapshots: snapshot_rx,
            cancel,
            task,
        })
    }

    /// 运行直到所有条目结束（或被取消）
    pub async fn run(self, inputs: Vec<StartupInput>) -> AppResult<BatchOutcome> {
        self.start(inputs)?.join().await
    }
}

/// 正在进行的批次
pub struct BatchHandle {
    snapshots: watch::Receiver<BatchSnapshot>,
    cancel: CancellationToken,
    task: JoinHandle<AppResult<BatchOutcome>>,
}

impl BatchHandle {
    /// 订阅快照；发送方关闭即表示运行结束
    pub fn snapshots(&self) -> watch::Receiver<BatchSnapshot> {
        self.snapshots.clone()
    }

    /// 请求取消
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 等待运行结束
    pub async fn join(self) -> AppResult<BatchOutcome> {
        self.task
            .await
            .map_err(|e| AppError::from(InvariantViolation::TaskPanicked(e.to_string())))?
    }
}

/// 批次统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub complete: usize,
    pub error: usize,
    pub cancelled: usize,
    /// 从未被接纳的条目
    pub pending: usize,
    /// 仍处于活跃阶段的条目，正常结束时必须为 0
    pub active: usize,
}

impl BatchSummary {
    pub fn from_run(run: &BatchRun) -> Self {
        Self {
            total: run.len(),
            complete: run.count(EntryStatus::Complete),
            error: run.count(EntryStatus::Error),
            cancelled: run.count(EntryStatus::Cancelled),
            pending: run.count(EntryStatus::Pending),
            active: run.active_count(),
        }
    }
}

/// 运行结果
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub run: BatchRun,
    pub summary: BatchSummary,
    pub cancelled: bool,
    /// 校验后的输入，与 `run.entries()` 一一对应
    pub inputs: Vec<StartupInput>,
}

impl BatchOutcome {
    /// 失败条目的原始输入，可作为新条目重新提交
    pub fn failed_inputs(&self) -> Vec<StartupInput> {
        self.run
            .entries()
            .iter()
            .zip(&self.inputs)
            .filter(|(entry, _)| entry.status() == EntryStatus::Error)
            .map(|(_, input)| input.clone())
            .collect()
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        ProgressReporter::project(&self.run)
    }
}

/// 汇总方：[`BatchRun`] 的唯一写入者
struct Aggregator {
    run: BatchRun,
    reporter: ProgressReporter,
    admitted: HashSet<usize>,
    snapshot_tx: watch::Sender<BatchSnapshot>,
    snapshot_stream: Option<mpsc::UnboundedSender<BatchSnapshot>>,
    report_sink: Option<Arc<dyn ReportSink>>,
}

impl Aggregator {
    async fn apply(&mut self, event: EntryEvent) -> Result<(), InvariantViolation> {
        let recorded = self.run.entry(event.index).ok_or_else(|| {
            InvariantViolation::StaleEvent {
                entry_id: event.entry.id().to_string(),
                recorded: "missing".to_string(),
                reported: event.from.to_string(),
            }
        })?;

        let to = event.entry.status();
        if recorded.id() != event.entry.id() || recorded.status() != event.from {
            return Err(InvariantViolation::StaleEvent {
                entry_id: event.entry.id().to_string(),
                recorded: recorded.status().to_string(),
                reported: event.from.to_string(),
            });
        }
        if !event.from.can_transition_to(to) {
            return Err(InvariantViolation::IllegalTransition {
                entry_id: event.entry.id().to_string(),
                from: event.from.to_string(),
                to: to.to_string(),
            });
        }
        if event.from == EntryStatus::Pending && !self.admitted.insert(event.index) {
            return Err(InvariantViolation::AdmittedTwice {
                entry_id: event.entry.id().to_string(),
            });
        }

        debug!(
            "[条目 {}] {} -> {} ({}%)",
            event.index + 1,
            event.from,
            to,
            event.entry.progress()
        );

        match to {
            EntryStatus::Complete => self.deliver_report(&event.entry).await,
            EntryStatus::Error => {
                if let Some(failure) = event.entry.error() {
                    warn!(
                        "[条目 {}] ⚠️ {} 失败: {}",
                        event.index + 1,
                        event.entry.name(),
                        failure
                    );
                }
            }
            _ => {}
        }

        self.run.replace(event.index, event.entry);
        self.publish();
        Ok(())
    }

    async fn deliver_report(&self, entry: &BatchEntry) {
        let (Some(sink), Some(report)) = (&self.report_sink, entry.result()) else {
            return;
        };
        if let Err(e) = sink.store(report).await {
            error!("{} 的报告保存失败: {}", entry.name(), e);
        }
    }

    fn publish(&mut self) {
        if let Some(snapshot) = self.reporter.observe(&self.run) {
            if let Some(stream) = &self.snapshot_stream {
                let _ = stream.send(snapshot.clone());
            }
            self.snapshot_tx.send_replace(snapshot);
        }
    }
}

/// 接纳条目并等待全部结束
async fn drive(
    mut aggregator: Aggregator,
    machines: Vec<EntryStateMachine>,
    inputs: Vec<StartupInput>,
    executor: Arc<dyn StageExecutor>,
    concurrency_limit: usize,
    cancel: CancellationToken,
) -> AppResult<BatchOutcome> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let admission = admit_in_order(machines, executor, concurrency_limit, cancel.clone(), event_tx);

    let aggregation = async {
        while let Some(event) = event_rx.recv().await {
            if let Err(violation) = aggregator.apply(event).await {
                error!("❌ {}", violation);
                cancel.cancel();
                return Err(violation);
            }
        }
        Ok(())
    };

    let (tasks, aggregated) = tokio::join!(admission, aggregation);

    for result in join_all(tasks).await {
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(violation)) => return Err(violation.into()),
            Err(e) => return Err(InvariantViolation::TaskPanicked(e.to_string()).into()),
        }
    }
    aggregated?;

    let cancelled = cancel.is_cancelled();
    let run = aggregator.run;
    let summary = BatchSummary::from_run(&run);

    if summary.active > 0 || (!cancelled && summary.pending > 0) {
        return Err(InvariantViolation::UnfinishedEntries {
            pending: summary.pending,
            active: summary.active,
        }
        .into());
    }

    log_run_complete(&summary, cancelled);

    Ok(BatchOutcome {
        run,
        summary,
        cancelled,
        inputs,
    })
}

/// 按提交顺序接纳条目，每个条目持有一个许可直到结束
///
/// 取消后不再接纳新条目，剩下的保持 `pending`
async fn admit_in_order(
    machines: Vec<EntryStateMachine>,
    executor: Arc<dyn StageExecutor>,
    concurrency_limit: usize,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<EntryEvent>,
) -> Vec<EntryTask> {
    let semaphore = Arc::new(Semaphore::new(concurrency_limit));
    let mut tasks = Vec::with_capacity(machines.len());

    for machine in machines {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        if cancel.is_cancelled() {
            break;
        }

        debug!("[条目 {}] 获得并发许可", machine.index() + 1);

        let executor = executor.clone();
        let events = events.clone();
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = permit;
            machine.run(executor.as_ref(), &events, &cancel).await
        }));
    }

    if cancel.is_cancelled() {
        info!("⏹️ 运行已取消，停止接纳新条目");
    }

    tasks
}

// ========== 日志辅助函数 ==========

fn log_run_start(total: usize, concurrency_limit: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始批量尽调");
    info!("📄 条目总数: {}", total);
    info!("📊 最大并发数: {}", concurrency_limit);
    info!("{}", "=".repeat(60));
}

fn log_run_complete(summary: &BatchSummary, cancelled: bool) {
    info!("\n{}", "─".repeat(60));
    if cancelled {
        info!("⏹️ 批次已取消");
    } else {
        info!("✓ 批次完成");
    }
    info!(
        "完成 {} / 失败 {} / 取消 {} / 未开始 {} / 共 {}",
        summary.complete, summary.error, summary.cancelled, summary.pending, summary.total
    );
    info!("{}", "─".repeat(60));
}
