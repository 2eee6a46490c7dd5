use std::time::Duration;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::{Job, JobResult};

/// 远程分析能力
///
/// 每次调用只做一次尝试，不含任何重试逻辑；超时由实现方负责。
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(
        &self,
        instruction: &str,
        job: &Job,
        timeout: Duration,
    ) -> Result<JobResult, RemoteError>;
}
