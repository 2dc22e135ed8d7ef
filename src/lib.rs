//! # DD Pipeline
//!
//! 批量尽调流水线：对一批初创公司依次执行网站抓取、路演材料解析和竞品分析，
//! 在并发上限内同时处理多家公司，并实时汇报每个条目和整个批次的进度。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 外部服务层（Clients）
//! - `clients/` - 抓取、路演材料解析、竞品分析三个 HTTP 服务
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个阶段
//! - `StageExecutor` - 执行一个阶段（超时、跳过、错误归类）
//! - `ReportWriter` - 写报告能力
//! - `FailureWriter` - 写 failures.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一家公司"的完整处理流程
//! - `EntryContext` - 上下文封装（条目ID + 阶段产出）
//! - `EntryStateMachine` - 状态机（scraping → parsing → analyzing → complete）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_orchestrator` - 批量编排器，管理并发和状态汇总
//! - `orchestrator/app` - 应用入口，加载输入和重提
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod testing;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, StageTimeouts};
pub use error::{AppError, AppResult};
pub use models::{BatchEntry, BatchRun, EntryStatus, StartupInput};
pub use orchestrator::{
    App, BatchHandle, BatchOrchestrator, BatchOutcome, BatchSnapshot, BatchSummary,
};
pub use services::{PipelineStageExecutor, StageExecutor};
pub use workflow::{EntryContext, EntryStateMachine};
