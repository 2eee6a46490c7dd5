//! 流式进度推送
//!
//! 后台运行整个批次，同时按固定间隔采样批次状态，每个间隔推送一个 `ProgressEvent`：
//!
//! ```text
//! 运行中   → chunk（无数据，progress = 已完成 / 总数）
//! 已成功   → 每个间隔推送一条结果（progress = 100），推完后 complete
//! 已失败   → error，结束
//! ```
//!
//! 批次结果只由后台任务写入一次（`watch` 通道），计时任务只读。
//! 消费者断开后计时任务立即停止；后台批次是否中止由 `CancellationPolicy` 决定。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::BatchError;
use crate::models::{BatchRequest, CancellationPolicy, JobResult, ProgressEvent, ProgressMode};
use crate::orchestrator::batch_orchestrator::{BatchHooks, BatchOrchestrator};

/// 采样间隔下限，`interval` 不接受零周期
const MIN_TICK: Duration = Duration::from_millis(1);

/// 推送给消费者的事件流
pub type ProgressStream = UnboundedReceiverStream<ProgressEvent>;

/// 批次状态快照
#[derive(Debug, Default)]
struct BatchSnapshot {
    /// 已完成的任务数，只由完成回调推进
    completed: usize,
    /// 批次结束后写入
    outcome: Option<Result<Arc<Vec<JobResult>>, BatchError>>,
}

/// 流式进度推送器
#[derive(Clone)]
pub struct ProgressPublisher {
    orchestrator: BatchOrchestrator,
    tick: Duration,
}

impl ProgressPublisher {
    pub fn new(orchestrator: BatchOrchestrator, tick: Duration) -> Self {
        Self {
            orchestrator,
            tick: tick.max(MIN_TICK),
        }
    }

    /// 启动后台批次并返回事件流
    ///
    /// 第一个事件在一个间隔之后推送，不等待批次结束。
    pub fn publish(&self, request: BatchRequest) -> ProgressStream {
        let total = request.jobs.len();
        let policy = request.options.cancellation;
        let cancel = CancellationToken::new();
        let (state_tx, mut state_rx) = watch::channel(BatchSnapshot::default());

        self.spawn_batch(request, state_tx, cancel.clone());

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let tick = self.tick;

        tokio::spawn(async move {
            // Propagate 策略下，计时任务退出即取消后台批次
            let _cancel_guard =
                (policy == CancellationPolicy::Propagate).then(|| cancel.drop_guard());

            let mut ticker = interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut delivered = 0;

            loop {
                tokio::select! {
                    _ = event_tx.closed() => {
                        info!("📴 消费者已断开，停止推送");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                // 写端已关闭却没有结果，说明后台批次异常退出
                let _ = state_rx.borrow_and_update();
                let batch_gone = state_rx.has_changed().is_err();
                let event = sample(&state_rx.borrow(), &mut delivered, total, batch_gone);
                let terminal = event.is_terminal();

                if event_tx.send(event).is_err() {
                    info!("📴 消费者已断开，停止推送");
                    break;
                }
                if terminal {
                    debug!("推送结束");
                    break;
                }
            }
        });

        UnboundedReceiverStream::new(event_rx)
    }

    /// 后台执行批次，结束后写入快照
    fn spawn_batch(
        &self,
        request: BatchRequest,
        state_tx: watch::Sender<BatchSnapshot>,
        cancel: CancellationToken,
    ) {
        let orchestrator = self.orchestrator.clone();

        tokio::spawn(async move {
            let total = request.jobs.len();
            let (completion_tx, mut completion_rx) = mpsc::unbounded_channel();
            let hooks = BatchHooks {
                cancel,
                // Sampled 模式不接收单任务完成通知，计数只在批次结束时推进
                completions: (request.options.progress == ProgressMode::PerJob)
                    .then_some(completion_tx),
            };

            let batch = orchestrator.run_batch_with(&request, hooks);
            tokio::pin!(batch);

            let outcome = loop {
                tokio::select! {
                    outcome = &mut batch => break outcome,
                    Some(done) = completion_rx.recv() => {
                        debug!("[笔记 {}] 已完成", done.job_id);
                        state_tx.send_modify(|snapshot| snapshot.completed += 1);
                    }
                }
            };

            match &outcome {
                Ok(_) => info!("✅ 所有 {} 条笔记分析完成", total),
                Err(e) => error!("流式分析失败：{}", e),
            }

            state_tx.send_modify(|snapshot| {
                if outcome.is_ok() {
                    snapshot.completed = total;
                }
                snapshot.outcome = Some(outcome.map(Arc::new));
            });
        });
    }
}

/// 根据快照生成本次间隔的事件
fn sample(
    snapshot: &BatchSnapshot,
    delivered: &mut usize,
    total: usize,
    batch_gone: bool,
) -> ProgressEvent {
    match &snapshot.outcome {
        Some(Err(err)) => ProgressEvent::error(err.to_string(), err.status_code()),
        Some(Ok(results)) => match results.get(*delivered) {
            Some(result) => {
                *delivered += 1;
                ProgressEvent::result(result.clone())
            }
            None => ProgressEvent::complete(),
        },
        None if batch_gone => {
            error!("后台批次未写入结果即退出");
            ProgressEvent::error("批量分析任务异常退出", 500)
        }
        None => ProgressEvent::pending(percent(snapshot.completed, total)),
    }
}

fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
