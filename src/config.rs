/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 采样温度，偏低以保证输出格式稳定
    pub llm_temperature: f32,
    /// 流式推送的采样间隔（毫秒）
    pub stream_tick_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            llm_model_name: "glm-4.5".to_string(),
            llm_temperature: 0.3,
            stream_tick_ms: 500,
            verbose_logging: false,
            output_log_file: "analysis_log.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_temperature),
            stream_tick_ms: parse_tick(std::env::var("STREAM_TICK_MS").ok()).unwrap_or(default.stream_tick_ms),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// chat completions 接口地址
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.llm_api_base_url.trim_end_matches('/'))
    }
}

/// 采样间隔必须为正数，0 或非法值回退到默认
fn parse_tick(raw: Option<String>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse().ok()).filter(|ms: &u64| *ms > 0)
}
