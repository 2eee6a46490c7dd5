//! 端到端测试：用 wiremock 模拟 chat completions 接口

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use notes_batch_analyzer::{
    App, BatchError, BatchOrchestrator, BatchRequest, Config, Job, LlmClient, ProgressEvent,
    RemoteError, RemoteErrorKind, RunOptions, Submission,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(base_url: &str) -> Config {
    Config {
        llm_api_key: "test-key".to_string(),
        llm_api_base_url: base_url.to_string(),
        stream_tick_ms: 20,
        ..Default::default()
    }
}

fn completion_for(note_id: &str, summary: &str) -> serde_json::Value {
    let content = json!({
        "noteId": note_id,
        "概述": summary,
        "详细分析": {
            "提及产品": ["燕麦片"],
            "核心概念": ["低卡"],
            "沟通场景": ["早餐"],
            "产品卖点": ["饱腹"],
            "面向人群": ["上班族"]
        }
    });
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": format!("```json\n{}\n```", content)
            },
            "finish_reason": "stop"
        }]
    })
}

async fn mount_note(server: &MockServer, note_id: &str, summary: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains(note_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_for(note_id, summary)))
        .mount(server)
        .await;
}

fn three_notes(options: RunOptions) -> BatchRequest {
    BatchRequest::new(
        "关注价格",
        vec![
            Job::new("note-alpha", "早餐燕麦", "三分钟搞定的早餐"),
            Job::new("note-beta", "通勤穿搭", "一周不重样"),
            Job::new("note-gamma", "露营装备", "轻量化清单"),
        ],
        options,
    )
}

fn blocking(timeout_ms: u64, max_retries: u32) -> RunOptions {
    RunOptions {
        streaming: false,
        timeout_ms,
        max_retries,
        ..Default::default()
    }
}

fn orchestrator_for(config: &Config) -> BatchOrchestrator {
    BatchOrchestrator::new(Arc::new(LlmClient::new(config).unwrap()))
}

#[tokio::test]
async fn test_blocking_batch_returns_results_in_input_order() {
    let server = MockServer::start().await;
    mount_note(&server, "note-alpha", "早餐").await;
    mount_note(&server, "note-beta", "穿搭").await;
    mount_note(&server, "note-gamma", "露营").await;

    let config = config_for(&server.uri());
    let app = App::new(config.clone(), Arc::new(LlmClient::new(&config).unwrap()));

    let response = match app.submit_batch(three_notes(blocking(2_000, 1))).await {
        Submission::Completed(response) => response,
        Submission::Streaming(_) => panic!("expected a blocking response"),
    };

    assert_eq!(response.code, 200);
    let results = response.data.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.job_id.as_str()).collect();
    assert_eq!(ids, vec!["note-alpha", "note-beta", "note-gamma"]);
    assert_eq!(results[1].summary, "穿搭");
    assert_eq!(results[0].details.products, vec!["燕麦片".to_string()]);
}

#[tokio::test]
async fn test_slow_remote_fails_after_two_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_for("note-slow", "慢"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&config_for(&server.uri()));
    let request = BatchRequest::new(
        "关注价格",
        vec![Job::new("note-slow", "标题", "内容")],
        blocking(100, 1),
    );

    let err = orchestrator.run_batch(&request).await.unwrap_err();

    match err {
        BatchError::JobFailed(failed) => {
            assert_eq!(failed.job_id, "note-slow");
            assert_eq!(failed.attempts, 2);
            assert_eq!(failed.last_error, RemoteError::Timeout { timeout_ms: 100 });
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_streaming_emits_results_then_complete() {
    let server = MockServer::start().await;
    mount_note(&server, "note-alpha", "早餐").await;
    mount_note(&server, "note-beta", "穿搭").await;
    mount_note(&server, "note-gamma", "露营").await;

    let config = config_for(&server.uri());
    let app = App::new(config.clone(), Arc::new(LlmClient::new(&config).unwrap()));
    let options = RunOptions {
        timeout_ms: 2_000,
        ..Default::default()
    };

    let stream = match app.submit_batch(three_notes(options)).await {
        Submission::Streaming(stream) => stream,
        Submission::Completed(_) => panic!("expected a stream"),
    };
    let events: Vec<ProgressEvent> = stream.collect().await;

    // 批次运行期间可能有若干空的进度 chunk，之后依次是三条结果和 complete
    let first_payload = events
        .iter()
        .position(|e| matches!(e, ProgressEvent::Chunk { data: Some(_), .. }))
        .unwrap();
    assert!(events[..first_payload]
        .iter()
        .all(|e| *e == ProgressEvent::pending(0)));

    let tail = &events[first_payload..];
    assert_eq!(tail.len(), 4);
    let ids: Vec<String> = tail[..3]
        .iter()
        .map(|e| match e {
            ProgressEvent::Chunk {
                data: Some(result),
                progress: 100,
            } => result.job_id.clone(),
            other => panic!("unexpected event: {:?}", other),
        })
        .collect();
    assert_eq!(ids, vec!["note-alpha", "note-beta", "note-gamma"]);
    assert_eq!(tail[3], ProgressEvent::complete());
    assert_eq!(
        tail[3].to_sse_frame().unwrap(),
        "data: {\"type\":\"complete\",\"progress\":100}\n\n"
    );
}

#[tokio::test]
async fn test_error_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&config_for(&server.uri()));
    let request = BatchRequest::new(
        "关注价格",
        vec![Job::new("note-alpha", "标题", "内容")],
        blocking(1_000, 2),
    );

    let err = orchestrator.run_batch(&request).await.unwrap_err();

    match err {
        BatchError::JobFailed(failed) => {
            assert_eq!(failed.attempts, 1);
            assert_eq!(failed.last_error.kind(), RemoteErrorKind::Protocol);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_echoed_id_mismatch_fails_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_for("note-other", "错位")))
        .mount(&server)
        .await;

    let orchestrator = orchestrator_for(&config_for(&server.uri()));
    let request = BatchRequest::new(
        "关注价格",
        vec![Job::new("note-alpha", "标题", "内容")],
        blocking(1_000, 2),
    );

    let err = orchestrator.run_batch(&request).await.unwrap_err();

    match err {
        BatchError::JobFailed(failed) => {
            assert_eq!(failed.attempts, 1);
            assert_eq!(
                failed.last_error,
                RemoteError::JobIdMismatch {
                    expected: "note-alpha".into(),
                    actual: "note-other".into(),
                }
            );
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_refused_connection_is_unavailable_and_retried() {
    // 绑定后立即释放，得到一个没有监听者的端口
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let orchestrator = orchestrator_for(&config_for(&format!("http://127.0.0.1:{}", port)));
    let request = BatchRequest::new(
        "关注价格",
        vec![Job::new("note-alpha", "标题", "内容")],
        blocking(1_000, 1),
    );

    let err = orchestrator.run_batch(&request).await.unwrap_err();

    match err {
        BatchError::JobFailed(failed) => {
            assert_eq!(failed.attempts, 2);
            assert_eq!(failed.last_error.kind(), RemoteErrorKind::Unavailable);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
