//! 测试工具
//!
//! [`ScriptedExecutor`] 不发网络请求，按脚本返回阶段结果，并记录调用情况，
//! 用于验证编排器的并发、顺序和取消行为。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::models::report::{Competitor, CompetitorAnalysis, ScrapedPage};
use crate::models::stage::{StageData, StageFailure, StageKind, StageOutcome};
use crate::services::StageExecutor;
use crate::workflow::EntryContext;

/// 按脚本执行阶段的测试执行器
///
/// 默认所有阶段成功；没有路演材料地址时解析阶段返回 `Skipped`。
#[derive(Default)]
pub struct ScriptedExecutor {
    failures: HashMap<(String, StageKind), StageFailure>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    gates: HashMap<StageKind, Arc<Semaphore>>,
    calls: Mutex<Vec<(String, StageKind)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定某家公司在某个阶段失败
    pub fn fail(mut self, name: &str, stage: StageKind, failure: StageFailure) -> Self {
        self.failures.insert((name.to_string(), stage), failure);
        self
    }

    /// 所有阶段调用的默认耗时
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// 某家公司每个阶段调用的耗时
    pub fn delay_for(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// 给某个阶段加闸门：每次调用都要先从闸门拿到一个许可
    ///
    /// 返回的信号量初始没有许可，测试通过 `add_permits` 放行
    pub fn with_gate(mut self, stage: StageKind) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.insert(stage, gate.clone());
        (self, gate)
    }

    /// 按调用顺序记录的 (公司名, 阶段)
    pub fn calls(&self) -> Vec<(String, StageKind)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// 某个阶段被调用的次数
    pub fn calls_for(&self, stage: StageKind) -> usize {
        self.calls().iter().filter(|(_, s)| *s == stage).count()
    }

    /// 同时进行中的阶段调用的最大值
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, name: &str, stage: StageKind) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.to_string(), stage));
        }
    }
}

#[async_trait]
impl StageExecutor for ScriptedExecutor {
    async fn execute(&self, stage: StageKind, ctx: &EntryContext) -> StageOutcome {
        let name = ctx.input.name.as_str();
        self.record(name, stage);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = self.gates.get(&stage) {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let delay = self.delays.get(name).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = match self.failures.get(&(name.to_string(), stage)) {
            Some(failure) => StageOutcome::Failed(failure.clone()),
            None => StageOutcome::Ok(default_data(stage, ctx)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

fn default_data(stage: StageKind, ctx: &EntryContext) -> StageData {
    match stage {
        StageKind::Scrape => StageData::Scraped(ScrapedPage {
            markdown: format!("# {}", ctx.input.name),
            metadata: None,
        }),
        StageKind::ParseDeck => match ctx.input.pitch_deck_url {
            Some(_) => StageData::Deck(format!("{} pitch deck", ctx.input.name)),
            None => StageData::Skipped,
        },
        StageKind::Analyze => StageData::Analysis(CompetitorAnalysis {
            detailed_competitors: vec![Competitor {
                name: format!("{} rival", ctx.input.name),
                details: Default::default(),
            }],
        }),
    }
}
