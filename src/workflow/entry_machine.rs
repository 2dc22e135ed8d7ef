//! 条目状态机 - 流程层
//!
//! 核心职责：定义"一家公司"的完整处理流程
//!
//! 流程顺序：
//! 1. 接纳 → scraping，执行抓取
//! 2. parsing，执行路演材料解析（没有材料时空跑一遍）
//! 3. analyzing，执行竞品分析
//! 4. complete，写入报告
//!
//! 任何阶段失败都转成 `error`，不向外抛出；取消只在阶段边界检查。

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::InvariantViolation;
use crate::models::entry::{BatchEntry, EntryStatus};
use crate::models::stage::{StageFailure, StageKind, StageOutcome};
use crate::models::startup::StartupInput;
use crate::services::StageExecutor;
use crate::utils::logging::truncate_text;
use crate::workflow::entry_ctx::EntryContext;

/// 状态迁移事件，携带迁移后的条目快照
#[derive(Debug, Clone)]
pub struct EntryEvent {
    /// 条目在批次中的位置（从0开始）
    pub index: usize,
    pub from: EntryStatus,
    pub entry: BatchEntry,
}

/// 条目状态机
///
/// - 独占自己的 [`BatchEntry`]，只有它能修改
/// - 每次迁移都发送一个 [`EntryEvent`]
/// - 阶段严格顺序执行
pub struct EntryStateMachine {
    index: usize,
    entry: BatchEntry,
    ctx: EntryContext,
}

impl EntryStateMachine {
    /// 为一条输入创建状态机，条目处于 `pending`
    pub fn new(index: usize, input: StartupInput) -> Self {
        let entry = BatchEntry::new(input.name.clone());
        let ctx = EntryContext::new(entry.id().to_string(), index + 1, input);
        Self { index, entry, ctx }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entry(&self) -> &BatchEntry {
        &self.entry
    }

    pub fn input(&self) -> &StartupInput {
        &self.ctx.input
    }

    /// 从接纳开始跑完整个流程
    ///
    /// # 返回
    /// 返回终态的条目；只有程序缺陷（非法迁移）才返回错误
    pub async fn run(
        mut self,
        executor: &dyn StageExecutor,
        events: &mpsc::UnboundedSender<EntryEvent>,
        cancel: &CancellationToken,
    ) -> Result<BatchEntry, InvariantViolation> {
        self.apply(events, |e| e.advance(EntryStatus::Scraping))?;
        info!("{} ▶️ 已接纳，开始处理", self.ctx);

        for stage in StageKind::SEQUENCE {
            if cancel.is_cancelled() {
                return self.freeze(events);
            }

            let outcome = executor.execute(stage, &self.ctx).await;

            if cancel.is_cancelled() {
                return self.freeze(events);
            }

            match outcome {
                StageOutcome::Ok(data) => {
                    if data.is_empty() {
                        debug!("{} 阶段 {} 没有产出内容", self.ctx, stage);
                    }
                    self.ctx.absorb(data);
                    self.finish_stage(stage, events)?;
                }
                StageOutcome::Failed(failure) => {
                    error!(
                        "{} ❌ 阶段 {} 失败: {}",
                        self.ctx,
                        stage,
                        truncate_text(&failure.reason, 200)
                    );
                    self.apply(events, |e| e.fail(failure))?;
                    return Ok(self.entry);
                }
            }
        }

        Ok(self.entry)
    }

    /// 阶段成功后推进到下一个状态
    fn finish_stage(
        &mut self,
        stage: StageKind,
        events: &mpsc::UnboundedSender<EntryEvent>,
    ) -> Result<(), InvariantViolation> {
        match stage {
            StageKind::Scrape => {
                info!("{} ✓ 抓取完成，开始解析路演材料", self.ctx);
                self.apply(events, |e| e.advance(EntryStatus::Parsing))
            }
            StageKind::ParseDeck => {
                info!("{} ✓ 解析完成，开始竞品分析", self.ctx);
                self.apply(events, |e| e.advance(EntryStatus::Analyzing))
            }
            StageKind::Analyze => match self.ctx.build_report() {
                Some(report) => {
                    info!(
                        "{} ✅ 分析完成，找到 {} 个竞品",
                        self.ctx,
                        report.competitors.len()
                    );
                    self.apply(events, |e| e.complete(report))
                }
                None => self.apply(events, |e| {
                    e.fail(StageFailure::invalid("analysis produced no result"))
                }),
            },
        }
    }

    /// 取消：保持当前进度，进入 `cancelled`
    fn freeze(
        mut self,
        events: &mpsc::UnboundedSender<EntryEvent>,
    ) -> Result<BatchEntry, InvariantViolation> {
        warn!(
            "{} ⏹️ 运行已取消，停在 {} ({}%)",
            self.ctx,
            self.entry.status(),
            self.entry.progress()
        );
        self.apply(events, BatchEntry::cancel)?;
        Ok(self.entry)
    }

    fn apply(
        &mut self,
        events: &mpsc::UnboundedSender<EntryEvent>,
        transition: impl FnOnce(&mut BatchEntry) -> Result<(), InvariantViolation>,
    ) -> Result<(), InvariantViolation> {
        let from = self.entry.status();
        transition(&mut self.entry)?;

        let event = EntryEvent {
            index: self.index,
            from,
            entry: self.entry.clone(),
        };
        if events.send(event).is_err() {
            debug!("{} 事件接收方已关闭", self.ctx);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedExecutor;

    async fn run_machine(
        input: StartupInput,
        executor: &ScriptedExecutor,
        cancel: &CancellationToken,
    ) -> (BatchEntry, Vec<EntryEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let machine = EntryStateMachine::new(0, input);
        let entry = machine.run(executor, &tx, cancel).await.unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (entry, events)
    }

    fn statuses(events: &[EntryEvent]) -> Vec<EntryStatus> {
        events.iter().map(|e| e.entry.status()).collect()
    }

    #[tokio::test]
    async fn test_happy_path_visits_every_state() {
        let executor = ScriptedExecutor::new();
        let input = StartupInput::new("Acme")
            .with_website("https://acme.io")
            .with_pitch_deck("https://acme.io/deck.pdf");

        let (entry, events) = run_machine(input, &executor, &CancellationToken::new()).await;

        assert_eq!(
            statuses(&events),
            vec![
                EntryStatus::Scraping,
                EntryStatus::Parsing,
                EntryStatus::Analyzing,
                EntryStatus::Complete
            ]
        );
        let progress: Vec<u8> = events.iter().map(|e| e.entry.progress()).collect();
        assert_eq!(progress, vec![25, 50, 75, 100]);
        assert_eq!(events[0].from, EntryStatus::Pending);

        let report = entry.result().unwrap();
        assert_eq!(report.deal_name, "Acme");
        assert_eq!(report.deck_excerpt.as_deref(), Some("Acme pitch deck"));
        assert!(entry.error().is_none());
    }

    #[tokio::test]
    async fn test_missing_deck_still_visits_parsing() {
        let executor = ScriptedExecutor::new();
        let (entry, events) = run_machine(
            StartupInput::new("C"),
            &executor,
            &CancellationToken::new(),
        )
        .await;

        assert!(statuses(&events).contains(&EntryStatus::Parsing));
        assert_eq!(entry.status(), EntryStatus::Complete);
        assert_eq!(entry.result().unwrap().deck_excerpt, None);
    }

    #[tokio::test]
    async fn test_failure_freezes_progress_and_stops() {
        let executor = ScriptedExecutor::new().fail(
            "Acme",
            StageKind::ParseDeck,
            StageFailure::upstream("deck parser unavailable"),
        );
        let (entry, events) = run_machine(
            StartupInput::new("Acme").with_pitch_deck("https://acme.io/deck.pdf"),
            &executor,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(entry.status(), EntryStatus::Error);
        assert_eq!(entry.progress(), 50);
        assert_eq!(entry.error().unwrap().reason, "deck parser unavailable");
        assert!(entry.result().is_none());
        assert_eq!(executor.calls_for(StageKind::Analyze), 0);
        assert_eq!(events.last().unwrap().from, EntryStatus::Parsing);
    }

    #[tokio::test]
    async fn test_cancel_during_stage_suppresses_next_transition() {
        let (executor, gate) = ScriptedExecutor::new().with_gate(StageKind::Scrape);
        let cancel = CancellationToken::new();

        let task = {
            let cancel = cancel.clone();
            async move { run_machine(StartupInput::new("Acme"), &executor, &cancel).await }
        };
        let releaser = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            cancel.cancel();
            gate.add_permits(1);
        };
        let ((entry, events), ()) = tokio::join!(task, releaser);

        assert_eq!(entry.status(), EntryStatus::Cancelled);
        assert_eq!(entry.progress(), 25);
        assert_eq!(
            statuses(&events),
            vec![EntryStatus::Scraping, EntryStatus::Cancelled]
        );
    }

    #[tokio::test]
    async fn test_resubmitted_input_gets_fresh_identity() {
        let input = StartupInput::new("Acme");
        let first = EntryStateMachine::new(0, input.clone());
        let second = EntryStateMachine::new(0, input);
        assert_ne!(first.entry().id(), second.entry().id());
        assert_eq!(second.entry().status(), EntryStatus::Pending);
    }
}
