//! # Notes Batch Analyzer
//!
//! 一个把一批笔记并发交给大模型分析、并以整批结果或流式进度返回的 Rust 库
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 远程调用能力，只做"一次调用"
//! - `AnalysisClient` - 分析能力的 trait 接口
//! - `LlmClient` - 基于 chat completions 接口的实现（单次调用超时、响应规范化）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 只处理单个 Job
//! - `JobRunner` - 按失败类型决定是否立即重试
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_orchestrator` - 并发分发、按序聚合、快速失败
//! - `orchestrator/progress_publisher` - 后台运行批次，定时推送进度事件
//!
//! ### ④ 应用层（App）
//! - `App` - 根据 `streaming` 选项返回完整结果或事件流
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::{App, Submission};
pub use clients::{AnalysisClient, LlmClient};
pub use config::Config;
pub use error::{BatchError, JobError, JobFailed, RemoteError, RemoteErrorKind};
pub use models::{
    load_batch_request, BatchRequest, BatchResponse, Job, JobResult, ProgressEvent, RunOptions,
};
pub use orchestrator::{BatchOrchestrator, ProgressPublisher, ProgressStream};
pub use services::JobRunner;
