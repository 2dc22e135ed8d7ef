//! 批量条目及其状态
//!
//! 状态是一个封闭的枚举，所有合法迁移都集中在 [`EntryStatus::can_transition_to`]。
//! [`BatchEntry`] 只能通过迁移方法修改，非法迁移返回 [`InvariantViolation`]。

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::InvariantViolation;
use crate::models::report::DueDiligenceReport;
use crate::models::stage::StageFailure;

/// 条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Scraping,
    Parsing,
    Analyzing,
    Complete,
    Error,
    Cancelled,
}

impl EntryStatus {
    /// 状态对应的固定进度；`Error` / `Cancelled` 冻结在进入前的进度，返回 None
    pub fn progress(&self) -> Option<u8> {
        match self {
            EntryStatus::Pending => Some(0),
            EntryStatus::Scraping => Some(25),
            EntryStatus::Parsing => Some(50),
            EntryStatus::Analyzing => Some(75),
            EntryStatus::Complete => Some(100),
            EntryStatus::Error | EntryStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntryStatus::Complete | EntryStatus::Error | EntryStatus::Cancelled
        )
    }

    /// 已被接纳且尚未结束
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            EntryStatus::Scraping | EntryStatus::Parsing | EntryStatus::Analyzing
        )
    }

    pub fn can_transition_to(&self, to: EntryStatus) -> bool {
        use EntryStatus::*;
        match (self, to) {
            (Pending, Scraping) => true,
            (Scraping, Parsing) | (Parsing, Analyzing) | (Analyzing, Complete) => true,
            (from, Error) | (from, Cancelled) => from.is_active(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Scraping => "scraping",
            EntryStatus::Parsing => "parsing",
            EntryStatus::Analyzing => "analyzing",
            EntryStatus::Complete => "complete",
            EntryStatus::Error => "error",
            EntryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一家公司在一次批量运行中的流水线实例
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    id: String,
    name: String,
    status: EntryStatus,
    progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<StageFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<DueDiligenceReport>,
}

impl BatchEntry {
    /// 创建处于 `pending` 的新条目，分配新的唯一 ID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            status: EntryStatus::Pending,
            progress: 0,
            error: None,
            result: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&StageFailure> {
        self.error.as_ref()
    }

    pub fn result(&self) -> Option<&DueDiligenceReport> {
        self.result.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 推进到下一个活跃阶段（scraping / parsing / analyzing）
    pub fn advance(&mut self, to: EntryStatus) -> Result<(), InvariantViolation> {
        if !to.is_active() {
            return Err(self.illegal(to));
        }
        self.move_to(to)
    }

    /// 分析完成，写入报告
    pub fn complete(&mut self, report: DueDiligenceReport) -> Result<(), InvariantViolation> {
        self.move_to(EntryStatus::Complete)?;
        self.result = Some(report);
        Ok(())
    }

    /// 阶段失败，进度冻结
    pub fn fail(&mut self, failure: StageFailure) -> Result<(), InvariantViolation> {
        self.move_to(EntryStatus::Error)?;
        self.error = Some(failure);
        Ok(())
    }

    /// 因外部取消而冻结，进度保持不变
    pub fn cancel(&mut self) -> Result<(), InvariantViolation> {
        self.move_to(EntryStatus::Cancelled)
    }

    fn move_to(&mut self, to: EntryStatus) -> Result<(), InvariantViolation> {
        if !self.status.can_transition_to(to) {
            return Err(self.illegal(to));
        }
        self.status = to;
        if let Some(progress) = to.progress() {
            self.progress = progress;
        }
        Ok(())
    }

    fn illegal(&self, to: EntryStatus) -> InvariantViolation {
        InvariantViolation::IllegalTransition {
            entry_id: self.id.clone(),
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}
