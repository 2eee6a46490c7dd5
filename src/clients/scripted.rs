//! 测试用的脚本化客户端，按笔记 ID 预设每次调用的结果和耗时

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::AnalysisClient;
use crate::error::RemoteError;
use crate::models::{AnalysisDimensions, Job, JobResult};

#[derive(Default)]
pub(crate) struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Result<(), RemoteError>>>>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<HashMap<String, u32>>,
    finished: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定结果，用完后一律成功
    pub(crate) fn script(self, job_id: &str, steps: Vec<Result<(), RemoteError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), steps.into());
        self
    }

    /// 每次调用都失败
    pub(crate) fn always_fail(self, job_id: &str, err: RemoteError) -> Self {
        self.script(job_id, vec![Err(err); 64])
    }

    pub(crate) fn delay(mut self, job_id: &str, delay: Duration) -> Self {
        self.delays.insert(job_id.to_string(), delay);
        self
    }

    pub(crate) fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub(crate) fn calls(&self, job_id: &str) -> u32 {
        self.calls.lock().unwrap().get(job_id).copied().unwrap_or(0)
    }

    /// 已经返回（未被中途取消）的调用次数
    pub(crate) fn finished(&self, job_id: &str) -> u32 {
        self.finished.lock().unwrap().get(job_id).copied().unwrap_or(0)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

pub(crate) fn sample_result(job_id: &str) -> JobResult {
    JobResult {
        job_id: job_id.to_string(),
        summary: format!("{} 的概述", job_id),
        details: AnalysisDimensions::default(),
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AnalysisClient for ScriptedClient {
    async fn analyze(
        &self,
        _instruction: &str,
        job: &Job,
        _timeout: Duration,
    ) -> Result<JobResult, RemoteError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(job.job_id.clone())
            .or_default() += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = self
            .delays
            .get(&job.job_id)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&job.job_id)
            .and_then(|steps| steps.pop_front())
            .unwrap_or(Ok(()));

        *self
            .finished
            .lock()
            .unwrap()
            .entry(job.job_id.clone())
            .or_default() += 1;

        step.map(|_| sample_result(&job.job_id))
    }
}
