//! 错误类型
//!
//! 分三层：单次远程调用（`RemoteError`）→ 单个任务（`JobError`）→ 整个批次（`BatchError`）。
//! 应用层胶水代码（配置、文件加载、命令行）统一使用 `anyhow::Result`。

use thiserror::Error;

/// 远程调用失败的分类，重试决策只看这个
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// 单次调用超时
    Timeout,
    /// 连接被拒绝/重置，未收到任何响应
    Unavailable,
    /// 收到响应但内容不可用
    Protocol,
}

/// 单次远程调用错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// 超过单次调用的超时时间
    #[error("远程调用超时 ({timeout_ms}ms)")]
    Timeout { timeout_ms: u64 },

    /// 远程服务不可达
    #[error("远程服务不可用: {message}")]
    Unavailable { message: String },

    /// 响应无法解析为预期结构
    #[error("远程响应格式错误: {message}")]
    Protocol { message: String },

    /// 响应中回显的 jobId 与请求不一致
    #[error("远程响应 jobId 不匹配: 期望 {expected}, 实际 {actual}")]
    JobIdMismatch { expected: String, actual: String },
}

impl RemoteError {
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            RemoteError::Timeout { .. } => RemoteErrorKind::Timeout,
            RemoteError::Unavailable { .. } => RemoteErrorKind::Unavailable,
            RemoteError::Protocol { .. } | RemoteError::JobIdMismatch { .. } => {
                RemoteErrorKind::Protocol
            }
        }
    }

    /// 超时和不可达视为瞬时故障
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            RemoteErrorKind::Timeout | RemoteErrorKind::Unavailable
        )
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        RemoteError::Protocol {
            message: message.into(),
        }
    }

    /// 根据 reqwest 的错误类型归类
    pub(crate) fn from_transport(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout { timeout_ms }
        } else if err.is_decode() {
            RemoteError::protocol(err.to_string())
        } else {
            // connect / request / body 读取中断，都算没拿到完整响应
            RemoteError::Unavailable {
                message: err.to_string(),
            }
        }
    }
}

/// 单个任务的终止性失败（重试耗尽或不可重试）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("任务 {job_id} 分析失败（共尝试 {attempts} 次）: {last_error}")]
pub struct JobFailed {
    pub job_id: String,
    pub attempts: u32,
    #[source]
    pub last_error: RemoteError,
}

/// 单个任务错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error(transparent)]
    Failed(#[from] JobFailed),

    /// 任务在完成前被取消
    #[error("任务 {job_id} 已取消")]
    Cancelled { job_id: String },

    /// 任务所在的 tokio task 异常退出（panic）
    #[error("任务 {job_id} 执行异常: {message}")]
    Aborted { job_id: String, message: String },
}

impl JobError {
    pub fn job_id(&self) -> &str {
        match self {
            JobError::Failed(failed) => &failed.job_id,
            JobError::Cancelled { job_id } | JobError::Aborted { job_id, .. } => job_id,
        }
    }

    pub(crate) fn aborted(job_id: String, err: tokio::task::JoinError) -> Self {
        tracing::error!("[笔记 {}] 任务执行异常: {}", job_id, err);
        JobError::Aborted {
            job_id,
            message: err.to_string(),
        }
    }
}

/// 批次错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// 请求本身不合法（空任务列表、空 ID 等）
    #[error("请求参数错误: {0}")]
    InvalidRequest(String),

    /// 任一任务失败即整个批次失败
    #[error("批量分析失败: {0}")]
    JobFailed(#[from] JobFailed),

    /// 批次被取消
    #[error("批量分析已取消")]
    Cancelled,

    /// 任务所在的 tokio task 异常退出（panic）
    #[error("任务 {job_id} 执行异常: {message}")]
    TaskAborted { job_id: String, message: String },
}

impl BatchError {
    /// 对外响应使用的状态码
    pub fn status_code(&self) -> u16 {
        match self {
            BatchError::InvalidRequest(_) => 400,
            _ => 500,
        }
    }
}

impl From<JobError> for BatchError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Failed(failed) => BatchError::JobFailed(failed),
            JobError::Cancelled { .. } => BatchError::Cancelled,
            JobError::Aborted { job_id, message } => BatchError::TaskAborted { job_id, message },
        }
    }
}
