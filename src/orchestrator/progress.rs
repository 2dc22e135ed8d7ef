//! 进度汇报
//!
//! 纯投影：给定 [`BatchRun`]，得到供界面展示的只读快照。
//! 只保存上一次发出的快照，用于判断是否有变化。

use serde::Serialize;

use crate::models::batch::BatchRun;
use crate::models::entry::{BatchEntry, EntryStatus};
use crate::models::stage::{FailureKind, StageFailure};

/// 单个条目的展示快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySnapshot {
    pub id: String,
    pub name: String,
    pub status: EntryStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    /// 失败原因值得提示用户重新提交
    pub retryable: bool,
    pub has_result: bool,
}

impl From<&BatchEntry> for EntrySnapshot {
    fn from(entry: &BatchEntry) -> Self {
        Self {
            id: entry.id().to_string(),
            name: entry.name().to_string(),
            status: entry.status(),
            progress: entry.progress(),
            error: entry.error().map(|f| f.reason.clone()),
            failure_kind: entry.error().map(|f| f.kind),
            retryable: entry.error().is_some_and(StageFailure::is_retryable),
            has_result: entry.result().is_some(),
        }
    }
}

/// 各状态的条目数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub active: usize,
    pub complete: usize,
    pub error: usize,
    pub cancelled: usize,
}

/// 整个批次的展示快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSnapshot {
    pub entries: Vec<EntrySnapshot>,
    pub overall_progress: u8,
    pub counts: StatusCounts,
    /// 所有条目都已到达终态
    pub finished: bool,
}

/// 进度汇报器
#[derive(Debug, Default)]
pub struct ProgressReporter {
    last: Option<BatchSnapshot>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计算快照，不改变任何状态
    pub fn project(run: &BatchRun) -> BatchSnapshot {
        let entries: Vec<EntrySnapshot> = run.entries().iter().map(EntrySnapshot::from).collect();

        let mut counts = StatusCounts::default();
        for entry in &entries {
            match entry.status {
                EntryStatus::Pending => counts.pending += 1,
                EntryStatus::Scraping | EntryStatus::Parsing | EntryStatus::Analyzing => {
                    counts.active += 1
                }
                EntryStatus::Complete => counts.complete += 1,
                EntryStatus::Error => counts.error += 1,
                EntryStatus::Cancelled => counts.cancelled += 1,
            }
        }

        BatchSnapshot {
            entries,
            overall_progress: run.overall_progress(),
            counts,
            finished: run.is_finished(),
        }
    }

    /// 重新计算快照；与上一次相同时返回 None
    pub fn observe(&mut self, run: &BatchRun) -> Option<BatchSnapshot> {
        let snapshot = Self::project(run);
        if self.last.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last = Some(snapshot.clone());
        Some(snapshot)
    }

    pub fn last(&self) -> Option<&BatchSnapshot> {
        self.last.as_ref()
    }
}
