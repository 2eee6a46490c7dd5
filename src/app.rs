use crate::clients::{AnalysisClient, LlmClient};
use crate::config::Config;
use crate::models::{BatchRequest, BatchResponse};
use crate::orchestrator::{BatchOrchestrator, ProgressPublisher, ProgressStream};
use crate::utils::logging;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 一次提交的返回形式，由 `options.streaming` 决定
pub enum Submission {
    /// 非流式：整批结束后的完整结果
    Completed(BatchResponse),
    /// 流式：进度事件流
    Streaming(ProgressStream),
}

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: BatchOrchestrator,
    publisher: ProgressPublisher,
    /// 运行日志文件，只有 `initialize` 创建的应用才写
    log_file: Option<String>,
}

impl App {
    /// 使用指定的分析客户端创建应用
    pub fn new(config: Config, client: Arc<dyn AnalysisClient>) -> Self {
        let orchestrator = BatchOrchestrator::new(client);
        let publisher = ProgressPublisher::new(
            orchestrator.clone(),
            Duration::from_millis(config.stream_tick_ms),
        );

        Self {
            config,
            orchestrator,
            publisher,
            log_file: None,
        }
    }

    /// 初始化应用：写日志文件头，创建 LLM 客户端
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;

        info!("🚀 程序启动 - 笔记批量分析");
        info!("🤖 模型: {}", config.llm_model_name);
        if config.llm_api_key.is_empty() {
            warn!("⚠️ 未设置 LLM_API_KEY，远程调用可能被拒绝");
        }

        let client = Arc::new(LlmClient::new(&config)?);
        let log_file = config.output_log_file.clone();

        let mut app = Self::new(config, client);
        app.log_file = Some(log_file);
        Ok(app)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 提交一个批次
    ///
    /// - 流式：立即返回事件流，批次在后台运行
    /// - 非流式：等待整批结束，返回完整结果或错误
    pub async fn submit_batch(&self, request: BatchRequest) -> Submission {
        if request.options.streaming {
            info!("📡 流式分析 {} 条笔记", request.jobs.len());
            return Submission::Streaming(self.publisher.publish(request));
        }

        let response = BatchResponse::from(self.orchestrator.run_batch(&request).await);
        self.record(&request, &response);
        Submission::Completed(response)
    }

    /// 将非流式结果追加到运行日志
    fn record(&self, request: &BatchRequest, response: &BatchResponse) {
        let Some(path) = &self.log_file else {
            return;
        };

        let line = format!(
            "[{}] 笔记 {} 条 | code={} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            request.jobs.len(),
            response.code,
            logging::truncate_text(&response.message, 200)
        );
        if let Err(e) = logging::append_log(path, &line) {
            warn!("写入运行日志失败: {}", e);
        }
    }
}
