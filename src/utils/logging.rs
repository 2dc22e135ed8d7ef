//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use anyhow::{Context, Result};
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::orchestrator::BatchSummary;

/// 安装全局 tracing 订阅者
///
/// 日志级别由 `RUST_LOG` 控制，默认 `info`；`verbose` 为 true 时默认 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n尽调批次日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件 {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(max_concurrent: usize, retry_rounds: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量尽调模式");
    info!("📊 最大并发数: {}", max_concurrent);
    if retry_rounds > 0 {
        info!("🔁 失败重提轮数: {}", retry_rounds);
    }
    info!("{}", "=".repeat(60));
}

/// 记录输入加载信息
///
/// # 参数
/// - `total`: 合法输入数量
/// - `dropped`: 被丢弃的非法输入数量
pub fn log_inputs_loaded(total: usize, dropped: usize) {
    info!("✓ 找到 {} 家待尽调的公司", total);
    if dropped > 0 {
        info!("⚠️ 丢弃 {} 条不合法的输入", dropped);
    }
}

/// 记录重提轮次开始
pub fn log_retry_round(round: usize, total_rounds: usize, count: usize) {
    info!("\n{}", "=".repeat(60));
    info!("🔁 第 {}/{} 轮重提: {} 家公司", round, total_rounds, count);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &BatchSummary, log_file_path: &str, failure_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.complete, summary.total);
    info!("❌ 失败: {}", summary.error);
    if summary.cancelled > 0 || summary.pending > 0 {
        info!("⏹️ 取消: {} / 未开始: {}", summary.cancelled, summary.pending);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
    if summary.error > 0 {
        info!("失败记录已保存至: {}", failure_file_path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("抓取失败了", 2), "抓取...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn test_init_log_file_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        init_log_file(path.to_str().unwrap()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("尽调批次日志"));
    }
}
