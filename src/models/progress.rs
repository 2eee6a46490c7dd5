//! 流式推送的进度事件
//!
//! 序列化格式（SSE）：`data: {"type":"chunk","data":{...},"progress":100}\n\n`

use serde::{Deserialize, Serialize};

use crate::models::job::JobResult;

/// 进度事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// 数据分片：运行中不带数据，完成后每次携带一条结果
    Chunk {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        data: Option<JobResult>,
        progress: u8,
    },
    /// 结束标识
    Complete { progress: u8 },
    /// 错误标识
    Error {
        #[serde(rename = "data")]
        message: String,
        code: u16,
        progress: u8,
    },
}

impl ProgressEvent {
    pub fn pending(progress: u8) -> Self {
        ProgressEvent::Chunk {
            data: None,
            progress,
        }
    }

    pub fn result(result: JobResult) -> Self {
        ProgressEvent::Chunk {
            data: Some(result),
            progress: 100,
        }
    }

    pub fn complete() -> Self {
        ProgressEvent::Complete { progress: 100 }
    }

    pub fn error(message: impl Into<String>, code: u16) -> Self {
        ProgressEvent::Error {
            message: message.into(),
            code,
            progress: 0,
        }
    }

    /// complete / error 之后流结束
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. } | ProgressEvent::Error { .. }
        )
    }

    pub fn progress(&self) -> u8 {
        match self {
            ProgressEvent::Chunk { progress, .. }
            | ProgressEvent::Complete { progress }
            | ProgressEvent::Error { progress, .. } => *progress,
        }
    }

    /// 编码为一个完整的 SSE 帧，以空行结尾
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}
