//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和并发调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载输入（Vec<StartupInput>）
//! - 失败重提、Ctrl-C 取消
//! - 输出全局统计信息
//!
//! ### `batch_orchestrator` - 批量编排器
//! - 控制并发数量（Semaphore），按提交顺序接纳
//! - 唯一写入 BatchRun 的汇总方
//! - 交付报告、处理取消
//!
//! ### `progress` - 进度汇报
//! - 从 BatchRun 计算只读快照
//!
//! ## 层次关系
//!
//! ```text
//! app (处理所有输入和重提轮次)
//!     ↓
//! batch_orchestrator (处理 Vec<StartupInput>)
//!     ↓
//! workflow::EntryStateMachine (处理单个条目)
//!     ↓
//! services (能力层：阶段执行 / 报告 / 失败记录)
//!     ↓
//! clients (外部服务：抓取 / 路演材料 / 竞品)
//! ```

pub mod app;
pub mod batch_orchestrator;
pub mod progress;

// 重新导出主要类型
pub use app::App;
pub use batch_orchestrator::{BatchHandle, BatchOrchestrator, BatchOutcome, BatchSummary};
pub use progress::{BatchSnapshot, EntrySnapshot, ProgressReporter, StatusCounts};
