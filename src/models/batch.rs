//! 一次批量提交

use serde::Serialize;

use crate::models::entry::{BatchEntry, EntryStatus};

/// 一次提交的 N 个条目，顺序在提交时固定
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRun {
    entries: Vec<BatchEntry>,
    concurrency_limit: usize,
}

impl BatchRun {
    pub fn new(entries: Vec<BatchEntry>, concurrency_limit: usize) -> Self {
        Self {
            entries,
            concurrency_limit,
        }
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&BatchEntry> {
        self.entries.get(index)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 替换某个位置上的条目（只由编排器调用）
    pub(crate) fn replace(&mut self, index: usize, entry: BatchEntry) {
        if let Some(slot) = self.entries.get_mut(index) {
            *slot = entry;
        }
    }

    /// 整体进度：`complete` 和 `error` 记为 100，其余取条目自身进度，四舍五入取均值
    pub fn overall_progress(&self) -> u8 {
        if self.entries.is_empty() {
            return 0;
        }
        let total: u32 = self.entries.iter().map(|e| effective_progress(e) as u32).sum();
        let mean = total as f64 / self.entries.len() as f64;
        mean.round() as u8
    }

    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status().is_active()).count()
    }

    pub fn is_finished(&self) -> bool {
        self.entries.iter().all(BatchEntry::is_terminal)
    }
}

/// 计入整体进度时的条目进度
pub fn effective_progress(entry: &BatchEntry) -> u8 {
    match entry.status() {
        EntryStatus::Complete | EntryStatus::Error => 100,
        _ => entry.progress(),
    }
}
