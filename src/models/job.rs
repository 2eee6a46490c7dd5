use serde::{Deserialize, Serialize};

/// 待分析的单条笔记
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "noteId", alias = "jobId")]
    pub job_id: String,
    pub title: String,
    #[serde(rename = "context", alias = "content")]
    pub content: String,
}

impl Job {
    pub fn new(
        job_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// 提取的 5 个核心维度
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDimensions {
    /// 提及的品牌、商品
    #[serde(rename = "提及产品", default)]
    pub products: Vec<String>,
    /// 笔记主题、关键理念
    #[serde(rename = "核心概念", default)]
    pub concepts: Vec<String>,
    /// 适用场景
    #[serde(rename = "沟通场景", default)]
    pub scenarios: Vec<String>,
    /// 产品优势或特点
    #[serde(rename = "产品卖点", default)]
    pub selling_points: Vec<String>,
    /// 目标受众
    #[serde(rename = "面向人群", default)]
    pub audiences: Vec<String>,
}

/// 单条笔记的分析结果
///
/// `job_id` 必须与请求中的笔记 ID 一致，由客户端校验，不信任远程返回值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    #[serde(rename = "noteId", alias = "jobId")]
    pub job_id: String,
    /// 营销核心概述（20 字以内）
    #[serde(rename = "概述", default)]
    pub summary: String,
    #[serde(rename = "详细分析", default)]
    pub details: AnalysisDimensions,
}
