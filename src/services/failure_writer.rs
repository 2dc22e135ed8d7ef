//! 失败记录服务 - 业务能力层
//!
//! 只负责"把失败条目追加到失败记录文件"能力

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::models::entry::BatchEntry;

/// 失败记录服务
///
/// 职责：
/// - 将进入 `error` 的条目写入失败记录文件
/// - 记录失败原因和类别，方便人工重提
pub struct FailureWriter {
    failure_file_path: String,
}

impl FailureWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            failure_file_path: path.into(),
        }
    }

    /// 写入一条失败记录；条目没有错误时什么也不做
    pub fn write(&self, entry: &BatchEntry) -> Result<()> {
        let Some(failure) = entry.error() else {
            return Ok(());
        };

        debug!("写入失败记录: {} | {}", entry.name(), failure.reason);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.failure_file_path)?;

        let line = format!(
            "{} | {} | 进度 {}% | {:?} | {}\n",
            entry.id(),
            entry.name(),
            entry.progress(),
            failure.kind,
            failure.reason
        );

        file.write_all(line.as_bytes())?;

        Ok(())
    }
}

impl Default for FailureWriter {
    fn default() -> Self {
        Self::with_path(crate::config::Config::default().failure_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::EntryStatus;
    use crate::models::stage::StageFailure;

    #[test]
    fn test_write_appends_failed_entries_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failures.txt");
        let writer = FailureWriter::with_path(path.to_string_lossy());

        let mut failed = BatchEntry::new("Acme");
        failed.advance(EntryStatus::Scraping).unwrap();
        failed.fail(StageFailure::timeout()).unwrap();
        let pending = BatchEntry::new("Globex");

        writer.write(&failed).unwrap();
        writer.write(&pending).unwrap();
        writer.write(&failed).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("Acme | 进度 25% | Timeout | timeout"));
    }
}
