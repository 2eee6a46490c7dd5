//! 批量分析编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **并发分发**：每条笔记一个 tokio 任务，默认不限并发
//! 2. **结果聚合**：按输入顺序收集结果，全部成功才算成功
//! 3. **快速失败**：首个被观察到的任务失败立即作为批次失败返回
//!
//! ## 失败后的剩余任务
//!
//! - `CancellationPolicy::Detach`（默认）：丢弃 JoinHandle，任务继续跑完，结果丢弃
//! - `CancellationPolicy::Propagate`：通过取消令牌中止剩余任务
//!
//! ## 可选能力
//!
//! - `max_concurrency`：用 Semaphore 限制同时在途的远程调用
//! - `BatchHooks::completions`：每个任务结束时发送一条 `JobCompletion`
//! - `run_batch_settled`：不做全有或全无，返回每个任务各自的结果

use std::sync::Arc;
use std::time::Instant;

use futures::future::{join_all, try_join_all};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clients::AnalysisClient;
use crate::error::{BatchError, JobError};
use crate::models::{BatchRequest, CancellationPolicy, JobResult};
use crate::services::JobRunner;
use crate::utils::logging;

/// 单个任务结束的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCompletion {
    /// 任务在输入中的位置
    pub index: usize,
    pub job_id: String,
    pub succeeded: bool,
}

/// 调用方接入批次执行过程的钩子
#[derive(Debug, Clone, Default)]
pub struct BatchHooks {
    /// 外部取消令牌
    pub cancel: CancellationToken,
    /// 每个任务结束时的通知通道
    pub completions: Option<mpsc::UnboundedSender<JobCompletion>>,
}

/// 批量分析编排器
#[derive(Clone)]
pub struct BatchOrchestrator {
    runner: JobRunner,
}

impl BatchOrchestrator {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        Self {
            runner: JobRunner::new(client),
        }
    }

    /// 执行整个批次，全部成功才返回结果
    pub async fn run_batch(&self, request: &BatchRequest) -> Result<Vec<JobResult>, BatchError> {
        self.run_batch_with(request, BatchHooks::default()).await
    }

    /// 带钩子执行整个批次
    pub async fn run_batch_with(
        &self,
        request: &BatchRequest,
        hooks: BatchHooks,
    ) -> Result<Vec<JobResult>, BatchError> {
        request.validate()?;

        let total = request.jobs.len();
        let policy = request.options.cancellation;
        let cancel = hooks.cancel.clone();
        let started = Instant::now();

        logging::log_batch_start(total, request.options.max_concurrency);

        let handles = self.spawn_jobs(request, hooks);

        let waits = handles.into_iter().map(|(job_id, handle)| async move {
            handle
                .await
                .unwrap_or_else(|e| Err(JobError::aborted(job_id, e)))
                .map_err(BatchError::from)
        });

        // try_join_all 在首个错误处返回，其余 JoinHandle 随之被丢弃（任务脱离，不会被中止）
        match try_join_all(waits).await {
            Ok(results) => {
                logging::log_batch_complete(total, total, started.elapsed());
                Ok(results)
            }
            Err(err) => {
                warn!("❌ 批次失败: {}", err);
                if policy == CancellationPolicy::Propagate {
                    debug!("取消批次中剩余的任务");
                    cancel.cancel();
                }
                Err(err)
            }
        }
    }

    /// 执行整个批次，返回每个任务各自的结果（部分成功）
    pub async fn run_batch_settled(
        &self,
        request: &BatchRequest,
    ) -> Result<Vec<Result<JobResult, JobError>>, BatchError> {
        request.validate()?;

        let total = request.jobs.len();
        let started = Instant::now();
        logging::log_batch_start(total, request.options.max_concurrency);

        let handles = self.spawn_jobs(request, BatchHooks::default());
        let settled: Vec<Result<JobResult, JobError>> = join_all(handles.into_iter().map(
            |(job_id, handle)| async move {
                handle
                    .await
                    .unwrap_or_else(|e| Err(JobError::aborted(job_id, e)))
            },
        ))
        .await;

        let succeeded = settled.iter().filter(|r| r.is_ok()).count();
        logging::log_batch_complete(succeeded, total, started.elapsed());

        Ok(settled)
    }

    /// 为每条笔记创建一个并发任务
    fn spawn_jobs(
        &self,
        request: &BatchRequest,
        hooks: BatchHooks,
    ) -> Vec<(String, JoinHandle<Result<JobResult, JobError>>)> {
        let instruction: Arc<str> = Arc::from(request.instruction.as_str());
        let options = Arc::new(request.options.clone());
        let limiter = request
            .options
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        request
            .jobs
            .iter()
            .enumerate()
            .map(|(index, job)| {
                let runner = self.runner.clone();
                let instruction = instruction.clone();
                let options = options.clone();
                let limiter = limiter.clone();
                let cancel = hooks.cancel.clone();
                let completions = hooks.completions.clone();
                let job = job.clone();
                let job_id = job.job_id.clone();

                let handle = tokio::spawn(async move {
                    let _permit = match limiter {
                        Some(semaphore) => tokio::select! {
                            _ = cancel.cancelled() => {
                                return Err(JobError::Cancelled { job_id: job.job_id.clone() });
                            }
                            permit = semaphore.acquire_owned() => permit.ok(),
                        },
                        None => None,
                    };

                    let result = runner.run(&instruction, &job, &options, &cancel).await;

                    if let Some(tx) = completions {
                        // 接收方已经不关心时忽略
                        let _ = tx.send(JobCompletion {
                            index,
                            job_id: job.job_id.clone(),
                            succeeded: result.is_ok(),
                        });
                    }

                    result
                });

                debug!("[笔记 {}] 已提交分析任务 ({}/{})", job_id, index + 1, request.jobs.len());
                (job_id, handle)
            })
            .collect()
    }
}
