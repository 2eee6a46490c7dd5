/// LLM API 客户端
///
/// 封装对 OpenAI 兼容的 chat completions 接口的单次调用：
/// 构造提示词 → 发送请求 → 清洗返回文本 → 解析并校验 noteId。
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clients::AnalysisClient;
use crate::config::Config;
use crate::error::RemoteError;
use crate::models::{Job, JobResult};
use crate::utils::logging::truncate_text;

/// LLM 客户端
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_name: String,
    temperature: f32,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self {
            http,
            endpoint: config.chat_completions_url(),
            api_key: config.llm_api_key.clone(),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
        })
    }

    /// 构建请求体，对同一组 (instruction, job) 结果固定
    fn build_request(
        &self,
        instruction: &str,
        job: &Job,
    ) -> Result<CreateChatCompletionRequest, RemoteError> {
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(build_prompt(instruction, job))
            .build()
            .map_err(|e| RemoteError::protocol(format!("请求构建失败: {}", e)))?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(self.temperature)
            .build()
            .map_err(|e| RemoteError::protocol(format!("请求构建失败: {}", e)))
    }

    /// 发送请求并读取完整响应体
    async fn send(
        &self,
        request: &CreateChatCompletionRequest,
        timeout_ms: u64,
    ) -> Result<String, RemoteError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| RemoteError::from_transport(e, timeout_ms))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::from_transport(e, timeout_ms))?;

        if !status.is_success() {
            return Err(RemoteError::protocol(format!(
                "HTTP {}: {}",
                status,
                truncate_text(&body, 200)
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl AnalysisClient for LlmClient {
    async fn analyze(
        &self,
        instruction: &str,
        job: &Job,
        timeout: Duration,
    ) -> Result<JobResult, RemoteError> {
        let timeout_ms = timeout.as_millis() as u64;
        let request = self.build_request(instruction, job)?;

        debug!("正在调用 LLM API，模型: {}，笔记: {}", self.model_name, job.job_id);
        let started = Instant::now();

        // 超时覆盖连接、发送和读取响应体的全过程
        let body = tokio::time::timeout(timeout, self.send(&request, timeout_ms))
            .await
            .map_err(|_| RemoteError::Timeout { timeout_ms })??;

        debug!(
            "LLM API 调用成功，笔记: {}，耗时 {}ms",
            job.job_id,
            started.elapsed().as_millis()
        );

        parse_completion(&body, job).map_err(|e| {
            warn!("笔记 {} 的响应无法使用: {}", job.job_id, e);
            e
        })
    }
}

/// 构造提示词（强制结构化输出格式）
pub fn build_prompt(instruction: &str, job: &Job) -> String {
    format!(
        r#"请分析下面这条笔记，并严格按要求输出：
1. 从标题和内容中提取 5 个维度：提及产品、核心概念、沟通场景、产品卖点、面向人群，每个维度为字符串数组，没有则为空数组；
2. 用 20 字以内的"概述"概括笔记的营销核心；
3. 只输出 JSON，不要输出解释或代码块标记；
4. JSON 结构必须为：
{{"noteId": "笔记ID", "概述": "20字以内", "详细分析": {{"提及产品": [], "核心概念": [], "沟通场景": [], "产品卖点": [], "面向人群": []}}}}

待分析笔记：
- 笔记ID：{}
- 标题：{}
- 内容：{}

额外要求：{}"#,
        job.job_id, job.title, job.content, instruction
    )
}

/// chat completions 响应中只取需要的字段
#[derive(Debug, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// 解析响应体并校验 noteId
pub(crate) fn parse_completion(body: &str, job: &Job) -> Result<JobResult, RemoteError> {
    let completion: CompletionBody = serde_json::from_str(body)
        .map_err(|e| RemoteError::protocol(format!("响应体不是合法的 completion: {}", e)))?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| RemoteError::protocol("LLM 返回内容为空"))?;

    let normalized = normalize_content(&content);
    let result: JobResult = serde_json::from_str(&normalized).map_err(|e| {
        RemoteError::protocol(format!(
            "无法解析分析结果: {} (内容: {})",
            e,
            truncate_text(&normalized, 120)
        ))
    })?;

    if result.job_id != job.job_id {
        return Err(RemoteError::JobIdMismatch {
            expected: job.job_id.clone(),
            actual: result.job_id,
        });
    }

    Ok(result)
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\s\p{Cc}]+").expect("静态正则必定合法"))
}

/// 清洗 LLM 返回的自由文本
///
/// 控制字符和连续空白合并为一个空格，再截取最外层的 `{...}`，
/// 去掉模型偶尔附带的代码块标记或说明文字。
pub fn normalize_content(raw: &str) -> String {
    let collapsed = whitespace_pattern().replace_all(raw, " ");
    let trimmed = collapsed.trim();

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}
