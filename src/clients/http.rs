//! 外部服务的 HTTP 公共部分
//!
//! 所有外部服务都是 JSON 请求 / JSON 响应，状态码统一映射：
//! - 4xx → [`ApiError::Rejected`]
//! - 其他非 2xx → [`ApiError::BadResponse`]
//! - 网络超时 → [`ApiError::Timeout`]

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{ApiError, AppError, AppResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 构建共享的 HTTP 客户端
pub fn build_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| AppError::api_request_failed("http-client", e))
}

/// 发送 JSON POST 请求并解析 JSON 响应
///
/// # 参数
/// - `client`: HTTP 客户端
/// - `endpoint`: 完整的服务地址
/// - `api_key`: 为空时不携带认证头
/// - `body`: 请求体
pub async fn post_json<B, T>(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    body: &B,
) -> AppResult<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    debug!("POST {}", endpoint);

    let mut request = client.post(endpoint).json(body);
    if !api_key.is_empty() {
        request = request.bearer_auth(api_key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| transport_error(endpoint, e))?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(endpoint, status, &body).into());
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(endpoint, e))?;
    debug!("{} 响应 {} 字节", endpoint, bytes.len());

    Ok(serde_json::from_slice(&bytes)?)
}

/// 把非 2xx 状态码归类为 [`ApiError`]
///
/// 响应体里的错误信息为空时，4xx 退回到状态码文本
pub fn status_error(endpoint: &str, status: StatusCode, body: &str) -> ApiError {
    let message = error_message(body);
    if status.is_client_error() {
        return ApiError::Rejected {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message: message.unwrap_or_else(|| status.to_string()),
        };
    }

    ApiError::BadResponse {
        endpoint: endpoint.to_string(),
        status: Some(status.as_u16()),
        message,
    }
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::api_timeout(endpoint)
    } else {
        AppError::api_request_failed(endpoint, err)
    }
}

/// 从错误响应体中提取 `error` 或 `message` 字段，不是 JSON 时返回原文
///
/// 空白信息视为没有信息
pub fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<JsonValue>(body) {
        Ok(value) => ["error", "message"].iter().find_map(|field| {
            non_blank(value.get(*field).and_then(|m| m.as_str()).map(str::to_string))
        }),
        Err(_) => Some(body.to_string()),
    }
}

/// 去掉空白的服务信息
pub fn non_blank(message: Option<String>) -> Option<String> {
    message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error":"Private hostnames are not allowed","message":"x"}"#),
            Some("Private hostnames are not allowed".to_string())
        );
        assert_eq!(
            error_message(r#"{"message":"rate limited"}"#),
            Some("rate limited".to_string())
        );
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway"), Some("Bad Gateway".to_string()));
        assert_eq!(error_message("   "), None);
        assert_eq!(error_message(r#"{"ok":false}"#), None);
    }

    #[test]
    fn test_blank_error_field_is_no_message() {
        assert_eq!(error_message(r#"{"error":""}"#), None);
        assert_eq!(
            error_message(r#"{"error":"  ","message":"rate limited"}"#),
            Some("rate limited".to_string())
        );
        assert_eq!(non_blank(Some(" \n".to_string())), None);
    }

    #[test]
    fn test_client_error_is_rejected_with_fallback_message() {
        let err = status_error("scrape", StatusCode::BAD_REQUEST, r#"{"error":""}"#);
        match err {
            ApiError::Rejected {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "400 Bad Request");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = status_error(
            "scrape",
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error":"Private hostnames are not allowed"}"#,
        );
        assert!(matches!(
            err,
            ApiError::Rejected { ref message, .. } if message == "Private hostnames are not allowed"
        ));
    }

    #[test]
    fn test_server_error_is_bad_response() {
        let err = status_error("analyze", StatusCode::BAD_GATEWAY, "");
        assert!(matches!(
            err,
            ApiError::BadResponse {
                status: Some(502),
                message: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_slow_service_is_timeout_not_rejection() {
        use tokio::net::TcpListener;

        // 接受连接但从不响应
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let result: AppResult<JsonValue> =
            post_json(&client, &format!("http://{}/scrape", addr), "", &serde_json::json!({})).await;

        assert!(matches!(
            result,
            Err(AppError::Api(ApiError::Timeout { .. }))
        ));
        server.abort();
    }

    #[tokio::test]
    async fn test_rejection_body_flows_through_post_json() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // 读完整个请求（请求体是 `{}`）再响应
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request.ends_with(b"{}") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let body = r#"{"error":""}"#;
            let response = format!(
                "HTTP/1.1 400 Bad Request\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        let client = build_client().unwrap();
        let result: AppResult<JsonValue> =
            post_json(&client, &format!("http://{}/scrape", addr), "", &serde_json::json!({})).await;

        match result {
            Err(AppError::Api(ApiError::Rejected { status, message, .. })) => {
                assert_eq!(status, 400);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected result: {other:?}"),
        }
        server.await.unwrap();
    }
}
