use serde::{Deserialize, Serialize};

use crate::error::BatchError;
use crate::models::job::JobResult;

/// 非流式返回的完整结果格式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    /// 状态码：200 成功，400 参数错误，500 失败
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Vec<JobResult>>,
    pub progress: u8,
}

impl BatchResponse {
    pub fn success(results: Vec<JobResult>) -> Self {
        Self {
            code: 200,
            message: "分析成功".to_string(),
            data: Some(results),
            progress: 100,
        }
    }

    pub fn failure(err: &BatchError) -> Self {
        Self {
            code: err.status_code(),
            message: err.to_string(),
            data: None,
            progress: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

impl From<Result<Vec<JobResult>, BatchError>> for BatchResponse {
    fn from(outcome: Result<Vec<JobResult>, BatchError>) -> Self {
        match outcome {
            Ok(results) => BatchResponse::success(results),
            Err(err) => BatchResponse::failure(&err),
        }
    }
}
