// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应模块
//!
//! - [`ResponseBuilder`]：每个请求独占的可变响应状态，钩子和处理器通过它修改状态码、头部与正文。
//! - [`Response`]：分发的唯一输出，即 (状态码, 头部, 正文) 三元组。
//! - [`Body`]：正文，可以是空、文本、字节、按顺序排列的字节块，或者包裹了另一个完整响应。

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::prelude::*;

use crate::param::*;

/// 响应头映射，按名称排序以保证序列化顺序稳定
pub type Headers = BTreeMap<String, String>;

/// 正文按最终写出的字节比较，`Body::Empty` 与空文本相等
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    /// 按顺序拼接的字节块
    Chunks(Vec<Bytes>),
    /// 处理器直接返回了一个完整响应，收尾时取出它自己的正文
    Wrapped(Box<Response>),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Text(s) => s.is_empty(),
            Body::Bytes(b) => b.is_empty(),
            Body::Chunks(c) => c.iter().all(Bytes::is_empty),
            Body::Wrapped(r) => r.body.is_empty(),
        }
    }

    /// 把正文拍平为连续字节
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Body::Empty => Bytes::new(),
            Body::Text(s) => Bytes::copy_from_slice(s.as_bytes()),
            Body::Bytes(b) => b.clone(),
            Body::Chunks(c) => Bytes::from(c.concat()),
            Body::Wrapped(r) => r.body.to_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Body::Empty => 0,
            Body::Text(s) => s.len(),
            Body::Bytes(b) => b.len(),
            Body::Chunks(c) => c.iter().map(Bytes::len).sum(),
            Body::Wrapped(r) => r.body.len(),
        }
    }

    /// 如果正文包裹了一个完整响应，取出其中的正文；否则原样返回。只拆一层。
    fn unwrap_payload(self) -> Body {
        match self {
            Body::Wrapped(inner) => inner.body,
            other => other,
        }
    }
}

impl PartialEq for Body {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::Empty
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<Vec<Bytes>> for Body {
    fn from(c: Vec<Bytes>) -> Self {
        Body::Chunks(c)
    }
}

impl From<Response> for Body {
    fn from(r: Response) -> Self {
        Body::Wrapped(Box::new(r))
    }
}

/// 单个请求独占的响应构建器。
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    status: u16,
    headers: Headers,
    body: Body,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Body>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// 产出响应三元组
    pub fn finish(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body.unwrap_payload(),
        }
    }
}

/// 响应三元组
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Body,
}

impl Response {
    pub fn new(status: u16, headers: Headers, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// 未匹配任何路由时的固定响应：404、空头部、空正文
    pub fn not_found() -> Self {
        Self::new(404, Headers::new(), Body::Empty)
    }

    /// 服务器边界在错误无人处理时给出的通用响应
    pub fn internal_error() -> Self {
        Self::new(500, Headers::new(), reason_phrase(500))
    }

    pub fn bad_request() -> Self {
        Self::new(400, Headers::new(), reason_phrase(400))
    }

    /// 请求超过 `max_request_size` 时的响应
    pub fn payload_too_large() -> Self {
        Self::new(413, Headers::new(), reason_phrase(413))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn information(&self) -> &'static str {
        reason_phrase(self.status)
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case(name))
    }

    /// 序列化为 HTTP/1.1 报文。`headonly` 为真时（HEAD 请求）只发送头部，
    /// `Content-Length` 仍按正文长度计算。
    pub fn as_bytes(&self, headonly: bool) -> Vec<u8> {
        let body = self.body.to_bytes();
        let mut header = format!("HTTP/1.1 {} {}{}", self.status, self.information(), CRLF);
        for (name, value) in &self.headers {
            header.push_str(&[name.as_str(), ": ", value.as_str(), CRLF].concat());
        }
        if !self.has_header("content-length") {
            header.push_str(&format!("Content-Length: {}{}", body.len(), CRLF));
        }
        header.push_str(&["Date: ", &format_date(&Utc::now()), CRLF].concat());
        header.push_str(&["Server: ", SERVER_NAME, CRLF].concat());
        header.push_str(&["Connection: close", CRLF].concat());
        header.push_str(CRLF);

        let mut bytes = header.into_bytes();
        if !headonly {
            bytes.extend_from_slice(&body);
        }
        bytes
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}
