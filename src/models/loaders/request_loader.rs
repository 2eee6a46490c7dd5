use crate::models::request::BatchRequest;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从 JSON 或 TOML 文件加载批量分析请求
///
/// 按扩展名选择解析方式，`.toml` 之外一律按 JSON 处理。
pub async fn load_batch_request(path: &Path) -> Result<BatchRequest> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取请求文件: {}", path.display()))?;

    let request = parse_batch_request(&content, path)?;

    request
        .validate()
        .with_context(|| format!("请求文件内容不合法: {}", path.display()))?;

    tracing::info!(
        "成功加载请求文件 {}，共 {} 条笔记",
        path.file_name().unwrap_or_default().to_string_lossy(),
        request.jobs.len()
    );

    Ok(request)
}

fn parse_batch_request(content: &str, path: &Path) -> Result<BatchRequest> {
    let is_toml = path.extension().and_then(|s| s.to_str()) == Some("toml");

    if is_toml {
        toml::from_str(content)
            .with_context(|| format!("无法解析TOML文件: {}", path.display()))
    } else {
        serde_json::from_str(content)
            .with_context(|| format!("无法解析JSON文件: {}", path.display()))
    }
}
