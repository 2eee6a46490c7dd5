use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 订阅者
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info。
/// 重复初始化（例如测试中）时静默忽略。
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n笔记批量分析日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 向日志文件追加一行
pub fn append_log(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 笔记总数
/// - `max_concurrency`: 并发上限，`None` 表示不限
pub fn log_batch_start(total: usize, max_concurrency: Option<usize>) {
    info!("{}", "=".repeat(60));
    info!("📦 开始批量分析，共 {} 条笔记", total);
    match max_concurrency {
        Some(limit) => info!("📊 最大并发数: {}", limit),
        None => info!("📊 最大并发数: 不限"),
    }
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `success`: 成功数量
/// - `total`: 笔记总数
/// - `elapsed`: 总耗时
pub fn log_batch_complete(success: usize, total: usize, elapsed: Duration) {
    info!("{}", "─".repeat(60));
    info!(
        "✓ 批量分析完成: 成功 {}/{}，耗时 {:.2}s",
        success,
        total,
        elapsed.as_secs_f64()
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// 换行和连续空白压成一个空格，保证预览只占一行。
///
/// # 参数
/// - `text`: 原始文本（例如 LLM 响应体）
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match single_line.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &single_line[..cut]),
        None => single_line,
    }
}
