//! 报告写入服务 - 业务能力层
//!
//! 只负责"把完成的尽调报告落盘"能力，不关心流程

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::report::DueDiligenceReport;

/// 完成条目的报告接收方
///
/// 编排器在每次 `complete` 迁移时调用；返回错误只会被记录，不影响条目状态
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn store(&self, report: &DueDiligenceReport) -> AppResult<()>;
}

/// 报告写入服务
///
/// 每份报告写成一个 JSON 文件：`<公司名>-<条目ID前8位>.json`
pub struct ReportWriter {
    report_folder: PathBuf,
}

impl ReportWriter {
    pub fn new(report_folder: impl Into<PathBuf>) -> Self {
        Self {
            report_folder: report_folder.into(),
        }
    }

    /// 报告文件路径
    pub fn report_path(&self, report: &DueDiligenceReport) -> PathBuf {
        let short_id: String = report.entry_id.chars().take(8).collect();
        self.report_folder
            .join(format!("{}-{}.json", slugify(&report.deal_name), short_id))
    }
}

#[async_trait]
impl ReportSink for ReportWriter {
    async fn store(&self, report: &DueDiligenceReport) -> AppResult<()> {
        fs::create_dir_all(&self.report_folder)
            .await
            .map_err(|e| AppError::file_write_failed(self.report_folder.display().to_string(), e))?;

        let path = self.report_path(report);
        let json = serde_json::to_string_pretty(report)?;

        fs::write(&path, json)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        debug!("报告已写入: {}", path.display());
        Ok(())
    }
}

/// 把公司名转换成文件名安全的片段
pub fn slugify(name: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

    let slug = re.replace_all(name.trim(), "-").trim_matches('-').to_lowercase();
    if slug.is_empty() {
        "startup".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report(name: &str) -> DueDiligenceReport {
        DueDiligenceReport {
            entry_id: "0123456789abcdef".to_string(),
            deal_name: name.to_string(),
            website: None,
            sector: "Fintech".to_string(),
            geography: "EU".to_string(),
            description: String::new(),
            website_metadata: None,
            deck_excerpt: None,
            competitors: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Corp, Inc."), "acme-corp-inc");
        assert_eq!(slugify("  ***  "), "startup");
        assert_eq!(slugify("云图科技"), "云图科技");
    }

    #[tokio::test]
    async fn test_store_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports"));
        let report = report("Acme Corp");

        writer.store(&report).await.unwrap();

        let path = writer.report_path(&report);
        assert!(path.ends_with("acme-corp-01234567.json"));
        let stored: DueDiligenceReport =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(stored, report);
    }
}
