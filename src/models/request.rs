use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::BatchError;
use crate::models::job::Job;

/// 批次失败或消费者断开时，对仍在运行的任务的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CancellationPolicy {
    /// 放任运行，结果丢弃
    #[default]
    Detach,
    /// 通过取消令牌中止剩余任务
    Propagate,
}

/// 流式进度的来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressMode {
    /// 仅在整个批次结束时推进计数（0 → 100）
    #[default]
    Sampled,
    /// 每个任务完成时推进计数
    PerJob,
}

/// 分析配置选项（流式/超时/重试）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunOptions {
    #[serde(alias = "stream")]
    pub streaming: bool,
    /// 单次调用超时（毫秒），按任务计算
    #[serde(alias = "timeout")]
    pub timeout_ms: u64,
    /// 每个任务的额外重试次数
    #[serde(alias = "retryCount")]
    pub max_retries: u32,
    /// 同时在途的远程调用上限，`None` 表示不限
    pub max_concurrency: Option<usize>,
    /// 格式错误是否也重试
    pub retry_protocol_errors: bool,
    pub cancellation: CancellationPolicy,
    pub progress: ProgressMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            streaming: true,
            timeout_ms: 30_000,
            max_retries: 2,
            max_concurrency: None,
            retry_protocol_errors: false,
            cancellation: CancellationPolicy::Detach,
            progress: ProgressMode::Sampled,
        }
    }
}

impl RunOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 总尝试次数 = 重试次数 + 1
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// 批量分析请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// 对每条笔记都生效的额外要求
    #[serde(alias = "prompt")]
    pub instruction: String,
    #[serde(alias = "notes")]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub options: RunOptions,
}

impl BatchRequest {
    pub fn new(instruction: impl Into<String>, jobs: Vec<Job>, options: RunOptions) -> Self {
        Self {
            instruction: instruction.into(),
            jobs,
            options,
        }
    }

    /// 校验请求的基本约束
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.instruction.trim().is_empty() {
            return Err(BatchError::InvalidRequest("提示词不能为空".to_string()));
        }
        if self.jobs.is_empty() {
            return Err(BatchError::InvalidRequest("待分析笔记列表不能为空".to_string()));
        }
        if let Some(index) = self.jobs.iter().position(|job| job.job_id.trim().is_empty()) {
            return Err(BatchError::InvalidRequest(format!(
                "第 {} 条笔记的 ID 为空",
                index + 1
            )));
        }
        match self.options.max_concurrency {
            Some(0) => {
                return Err(BatchError::InvalidRequest("maxConcurrency 必须大于 0".to_string()));
            }
            Some(limit) if limit > Semaphore::MAX_PERMITS => {
                return Err(BatchError::InvalidRequest(format!(
                    "maxConcurrency 不能超过 {}",
                    Semaphore::MAX_PERMITS
                )));
            }
            _ => {}
        }
        Ok(())
    }
}
