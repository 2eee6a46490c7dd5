//! 单任务执行器 - 业务能力层
//!
//! 只负责"一条笔记"的分析：调用远程客户端，按失败类型决定是否立即重试。
//! 不关心批次、顺序和进度。

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::clients::AnalysisClient;
use crate::error::{JobError, JobFailed, RemoteErrorKind};
use crate::models::{Job, JobResult, RunOptions};

/// 带重试的单任务执行器
///
/// - 超时 / 不可达：立即重试，最多 `max_retries` 次
/// - 格式错误：默认不重试（同样的输入大概率得到同样的输出）
/// - 每次尝试都记录日志（次数、耗时），但不返回给调用方
#[derive(Clone)]
pub struct JobRunner {
    client: Arc<dyn AnalysisClient>,
}

impl JobRunner {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        Self { client }
    }

    pub async fn run(
        &self,
        instruction: &str,
        job: &Job,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<JobResult, JobError> {
        let max_attempts = options.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(JobError::Cancelled {
                    job_id: job.job_id.clone(),
                });
            }

            debug!("开始分析笔记：{}（第 {} 次）", job.job_id, attempt);
            let started = Instant::now();

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("笔记 {} 在第 {} 次尝试中被取消", job.job_id, attempt);
                    return Err(JobError::Cancelled { job_id: job.job_id.clone() });
                }
                outcome = self.client.analyze(instruction, job, options.timeout()) => outcome,
            };

            let elapsed_ms = started.elapsed().as_millis();

            let err = match outcome {
                Ok(result) => {
                    debug!(
                        "笔记 {} 分析成功（第 {} 次，耗时 {}ms）",
                        job.job_id, attempt, elapsed_ms
                    );
                    return Ok(result);
                }
                Err(err) => err,
            };

            let retryable = match err.kind() {
                RemoteErrorKind::Timeout | RemoteErrorKind::Unavailable => true,
                RemoteErrorKind::Protocol => options.retry_protocol_errors,
            };

            if retryable && attempt < max_attempts {
                warn!(
                    "笔记 {} 分析失败，将重试（剩余 {} 次，耗时 {}ms）：{}",
                    job.job_id,
                    max_attempts - attempt,
                    elapsed_ms,
                    err
                );
                continue;
            }

            let failed = JobFailed {
                job_id: job.job_id.clone(),
                attempts: attempt,
                last_error: err,
            };
            error!("{}", failed);
            return Err(JobError::Failed(failed));
        }
    }
}
