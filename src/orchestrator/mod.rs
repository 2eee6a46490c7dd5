//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量分发和进度调度，不做具体的分析判断。
//!
//! ## 模块划分
//!
//! ### `batch_orchestrator` - 批量分析编排器
//! - 每条笔记一个并发任务
//! - 按输入顺序聚合结果，全有或全无
//! - 可选的并发上限（Semaphore）和取消传播
//!
//! ### `progress_publisher` - 流式进度推送
//! - 后台运行批次
//! - 按固定间隔采样并推送 `ProgressEvent`
//!
//! ## 层次关系
//!
//! ```text
//! progress_publisher (事件流)
//!     ↓
//! batch_orchestrator (处理 Vec<Job>)
//!     ↓
//! services::JobRunner (处理单个 Job，含重试)
//!     ↓
//! clients (远程调用：AnalysisClient)
//! ```

pub mod batch_orchestrator;
pub mod progress_publisher;

// 重新导出主要类型
pub use batch_orchestrator::{BatchHooks, BatchOrchestrator, JobCompletion};
pub use progress_publisher::{ProgressPublisher, ProgressStream};
