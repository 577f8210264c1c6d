// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务器边界
//!
//! 分发内核不关心连接如何被接受、字节如何读写。这里提供一个最薄的外壳：
//! - [`respond`]：原始请求字节 → 解析 → 分发 → 响应字节。解析失败返回 400，
//!   分发中无人处理的错误在此被记录并转成通用的 500。
//! - [`serve`]：基于 Tokio 的接收循环，每个连接一个任务，处理一个请求后关闭连接。

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::{
    app::Dispatcher,
    config::Config,
    error::AppError,
    param::HttpRequestMethod,
    request::{find_head_end, Request},
    response::Response,
};

/// 服务器调用分发内核的接缝
#[cfg_attr(test, mockall::automock)]
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, request: Request) -> Result<Response, AppError>;
}

impl<A> Dispatch for Dispatcher<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn dispatch(&self, request: Request) -> Result<Response, AppError> {
        Dispatcher::dispatch(self, request)
    }
}

/// 处理一个完整的请求报文并返回要写回的字节
pub fn respond(dispatcher: &dyn Dispatch, buffer: &[u8], id: u128) -> Vec<u8> {
    let start_time = Instant::now();

    let request = match Request::try_from(buffer, id) {
        Ok(req) => req,
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败：{}，返回400", id, e);
            return Response::bad_request().as_bytes(false);
        }
    };
    let headonly = request.method() == HttpRequestMethod::Head;
    let method = request.method();
    let path = request.path().to_string();
    let user_agent = request.user_agent().to_string();

    let response = match dispatcher.dispatch(request) {
        Ok(response) => response,
        Err(err) => {
            error!("[ID{}]未处理的应用错误（{}）：{}，返回500", id, err.type_name(), err);
            Response::internal_error()
        }
    };

    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}ms",
        id,
        method,
        path,
        response.status_code(),
        response.information(),
        user_agent,
        start_time.elapsed().as_millis()
    );
    response.as_bytes(headonly)
}

/// 读取结果：完整的请求，或超出上限的请求
#[derive(Debug, PartialEq)]
enum Incoming {
    Complete(Vec<u8>),
    TooLarge,
}

/// 读取一个请求：直到头部结束且正文满足 `Content-Length`，或对端关闭。
///
/// 头部加声明的正文超过 `limit`，或读满 `limit` 仍未见到头部结束时，返回 `TooLarge`，不截断。
async fn read_request(stream: &mut TcpStream, limit: usize) -> std::io::Result<Incoming> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        match find_head_end(&buffer) {
            Some(end) => {
                let total = end + 4 + declared_length(&buffer[..end]);
                if total > limit {
                    return Ok(Incoming::TooLarge);
                }
                if buffer.len() >= total {
                    break;
                }
            }
            None if buffer.len() >= limit => return Ok(Incoming::TooLarge),
            None => {}
        }
    }
    Ok(Incoming::Complete(buffer))
}

/// 从头部中取出 `Content-Length`，缺失或非法时视为 0
fn declared_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

async fn handle_connection(mut stream: TcpStream, id: u128, dispatcher: Arc<dyn Dispatch>, limit: usize) {
    let bytes = match read_request(&mut stream, limit).await {
        Ok(Incoming::Complete(buffer)) if buffer.is_empty() => return, // 客户端主动关闭连接
        Ok(Incoming::Complete(buffer)) => {
            debug!("[ID{}]HTTP请求接收完毕，{}字节", id, buffer.len());
            respond(dispatcher.as_ref(), &buffer, id)
        }
        Ok(Incoming::TooLarge) => {
            warn!("[ID{}]请求超过{}字节的上限，返回413", id, limit);
            Response::payload_too_large().as_bytes(false)
        }
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误：{}", id, e);
            return;
        }
    };
    if let Err(e) = stream.write_all(&bytes).await {
        error!("[ID{}]发送响应失败：{}", id, e);
        return;
    }
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}

/// 接收连接直到 `shutdown` 完成。每个连接在独立的 Tokio 任务中处理。
pub async fn serve<F>(
    listener: TcpListener,
    dispatcher: Arc<dyn Dispatch>,
    config: Arc<Config>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut id: u128 = 0;
    loop {
        let (stream, addr) = tokio::select! {
            _ = &mut shutdown => {
                info!("接收到停机指令，停止接收新连接");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    // 单次 accept 失败（如文件描述符耗尽）不终止监听循环
                    warn!("[ID{}]接受连接失败：{}", id, e);
                    continue;
                }
            },
        };
        debug!("[ID{}]新的连接：{}", id, addr);

        let dispatcher = Arc::clone(&dispatcher);
        let limit = config.max_request_size();
        tokio::spawn(handle_connection(stream, id, dispatcher, limit));
        id += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Headers;
    use std::fmt;

    #[derive(Debug)]
    struct Unhandled;

    impl fmt::Display for Unhandled {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "unhandled")
        }
    }

    impl std::error::Error for Unhandled {}

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8_lossy(&bytes).to_string()
    }

    #[test]
    fn test_respond_serializes_dispatch_result() {
        let mut mock = MockDispatch::new();
        mock.expect_dispatch()
            .withf(|req| req.path() == "/greet/Ada")
            .times(1)
            .returning(|_| Ok(Response::new(200, Headers::new(), "Hello, Ada")));

        let out = text(respond(&mock, b"GET /greet/Ada HTTP/1.1\r\nHost: x\r\n\r\n", 1));
        assert!(out.starts_with("HTTP/1.1 200 OK"));
        assert!(out.ends_with("Hello, Ada"));
    }

    /// 无人处理的错误在服务器边界变成通用的 500
    #[test]
    fn test_respond_turns_propagated_error_into_500() {
        let mut mock = MockDispatch::new();
        mock.expect_dispatch()
            .times(1)
            .returning(|_| Err(AppError::from(Unhandled)));

        let out = text(respond(&mock, b"GET /boom HTTP/1.1\r\n\r\n", 2));
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error"));
    }

    #[test]
    fn test_respond_rejects_unparseable_request() {
        let mut mock = MockDispatch::new();
        mock.expect_dispatch().times(0);

        let out = text(respond(&mock, b"GET / HTTP/9.9\r\n\r\n", 3));
        assert!(out.starts_with("HTTP/1.1 400 Bad Request"));
    }

    #[test]
    fn test_respond_head_omits_body() {
        let mut mock = MockDispatch::new();
        mock.expect_dispatch()
            .returning(|_| Ok(Response::new(200, Headers::new(), "payload")));

        let out = text(respond(&mock, b"HEAD / HTTP/1.1\r\n\r\n", 4));
        assert!(out.contains("Content-Length: 7"));
        assert!(!out.ends_with("payload"));
    }

    /// 通过本地回环连接把 `raw` 交给 `read_request`
    async fn read_with_limit(raw: &'static [u8], limit: usize) -> Incoming {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(raw).await.unwrap();
            stream
        });
        let (mut stream, _) = listener.accept().await.unwrap();
        let incoming = read_request(&mut stream, limit).await.unwrap();
        drop(client.await.unwrap());
        incoming
    }

    #[tokio::test]
    async fn test_read_request_complete_within_limit() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
        assert_eq!(read_with_limit(raw, 1024).await, Incoming::Complete(raw.to_vec()));
    }

    /// 声明的正文超过上限时直接拒绝，不读取也不截断正文
    #[tokio::test]
    async fn test_read_request_declared_body_too_large() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 100\r\n\r\n";
        assert_eq!(read_with_limit(raw, 64).await, Incoming::TooLarge);
    }

    #[tokio::test]
    async fn test_read_request_head_without_end_too_large() {
        let raw = b"GET /aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        assert_eq!(read_with_limit(raw, 32).await, Incoming::TooLarge);
    }

    #[test]
    fn test_declared_length() {
        assert_eq!(declared_length(b"POST / HTTP/1.1\r\ncontent-length: 12"), 12);
        assert_eq!(declared_length(b"GET / HTTP/1.1\r\nHost: x"), 0);
    }
}
