//! 阶段类型与阶段结果

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::report::{CompetitorAnalysis, ScrapedPage};

/// 阶段种类，按执行顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageKind {
    Scrape,
    ParseDeck,
    Analyze,
}

impl StageKind {
    /// 条目流水线的固定阶段顺序
    pub const SEQUENCE: [StageKind; 3] = [StageKind::Scrape, StageKind::ParseDeck, StageKind::Analyze];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Scrape => "scrape",
            StageKind::ParseDeck => "parseDeck",
            StageKind::Analyze => "analyze",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阶段失败的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// 超过阶段时限
    Timeout,
    /// 服务拒绝了输入（4xx 或本地 URL 检查不通过）
    Rejected,
    /// 服务返回失败结果或 5xx
    Upstream,
    /// 网络层失败
    Transport,
    /// 服务返回内容无法使用
    Invalid,
}

impl FailureKind {
    pub fn default_reason(&self) -> &'static str {
        match self {
            FailureKind::Timeout => StageFailure::TIMEOUT_REASON,
            FailureKind::Rejected => "request rejected",
            FailureKind::Upstream => "service reported a failure",
            FailureKind::Transport => "network error",
            FailureKind::Invalid => "invalid response",
        }
    }
}

/// 阶段失败
///
/// `reason` 原样展示给调用方；超时的 reason 固定为 `timeout`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl StageFailure {
    pub const TIMEOUT_REASON: &'static str = "timeout";

    /// 原因为空白时使用类别的默认原因，保证 `reason` 不为空
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let trimmed = reason.trim();
        let reason = if trimmed.is_empty() {
            kind.default_reason().to_string()
        } else {
            trimmed.to_string()
        };
        Self { kind, reason }
    }

    pub fn timeout() -> Self {
        Self {
            kind: FailureKind::Timeout,
            reason: Self::TIMEOUT_REASON.to_string(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Rejected, reason)
    }

    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Upstream, reason)
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, reason)
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(FailureKind::Invalid, reason)
    }

    /// 是否值得建议用户重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::Timeout | FailureKind::Transport | FailureKind::Upstream
        )
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// 阶段成功时的产物
#[derive(Debug, Clone, PartialEq)]
pub enum StageData {
    /// 缺少可选输入，阶段被跳过
    Skipped,
    Scraped(ScrapedPage),
    /// 路演材料文本，可能为空字符串
    Deck(String),
    Analysis(CompetitorAnalysis),
}

impl StageData {
    pub fn is_empty(&self) -> bool {
        match self {
            StageData::Skipped => true,
            StageData::Scraped(page) => page.markdown.is_empty() && page.metadata.is_none(),
            StageData::Deck(content) => content.is_empty(),
            StageData::Analysis(_) => false,
        }
    }
}

/// 阶段执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Ok(StageData),
    Failed(StageFailure),
}

impl StageOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageOutcome::Ok(_))
    }
}

impl From<Result<StageData, StageFailure>> for StageOutcome {
    fn from(result: Result<StageData, StageFailure>) -> Self {
        match result {
            Ok(data) => StageOutcome::Ok(data),
            Err(failure) => StageOutcome::Failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_reason_is_literal() {
        let failure = StageFailure::timeout();
        assert_eq!(failure.reason, "timeout");
        assert_eq!(failure.to_string(), "timeout");
        assert!(failure.is_retryable());
        assert!(!StageFailure::rejected("blocked host").is_retryable());
    }

    #[test]
    fn test_blank_reason_falls_back_to_kind_default() {
        assert_eq!(StageFailure::upstream("").reason, "service reported a failure");
        assert_eq!(StageFailure::rejected("  ").reason, "request rejected");
        assert_eq!(StageFailure::transport(" reset ").reason, "reset");
        assert_eq!(StageFailure::new(FailureKind::Timeout, "").reason, "timeout");
    }

    #[test]
    fn test_empty_deck_counts_as_empty_data() {
        assert!(StageData::Deck(String::new()).is_empty());
        assert!(StageData::Skipped.is_empty());
        assert!(!StageData::Deck("slides".to_string()).is_empty());
    }
}
