// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求模块
//!
//! `Request` 是分发内核的输入：方法、路径、查询串、头部、正文，以及由查询串和
//! 表单正文合并得到的参数映射。它既可以在测试与嵌入场景中直接构造，
//! 也可以由 [`Request::try_from`] 从 TCP 流中读出的原始字节解析得到。

use bytes::Bytes;
use log::error;

use crate::{exception::Exception, param::*, params::Params};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// 表示一个完整的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// 服务器分配的请求 ID，用于在多线程环境下追踪日志
    id: u128,
    method: HttpRequestMethod,
    /// 不含查询串的路径
    path: String,
    /// `?` 之后的原始查询串，可能为空
    query: String,
    version: HttpVersion,
    /// 按出现顺序保存的头部
    headers: Vec<(String, String)>,
    body: Bytes,
    params: Params,
}

impl Request {
    /// 以方法和请求目标（可带查询串）构造请求，查询串会立即解析进参数映射。
    pub fn new(method: HttpRequestMethod, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (target.to_string(), String::new()),
        };
        let params = Params::parse_urlencoded(query.as_bytes());
        Self {
            id: 0,
            method,
            path,
            query,
            version: HttpVersion::V1_1,
            headers: vec![],
            body: Bytes::new(),
            params,
        }
    }

    pub fn with_id(mut self, id: u128) -> Self {
        self.id = id;
        self
    }

    /// 添加头部。正文已存在且新头部声明了表单编码时，立即合并表单参数。
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        if name.eq_ignore_ascii_case("content-type") && !self.body.is_empty() {
            self.merge_form();
        }
        self
    }

    /// 设置正文。表单编码的正文参数覆盖同名查询参数，与头部的设置顺序无关。
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.merge_form();
        self
    }

    fn merge_form(&mut self) {
        if self.is_form() {
            let form = Params::parse_urlencoded(&self.body);
            self.params.merge(form);
        }
    }

    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 以空行切分头部与正文，头部必须是合法的 UTF-8。
    /// 2. 解析请求行：提取方法、目标和协议版本。
    /// 3. 逐行解析头部字段。
    /// 4. 按 `Content-Length` 截取正文，并在表单编码时解析表单参数。
    ///
    /// # 错误处理
    /// 如果请求格式不符合 HTTP 规范或使用了不支持的方法/版本，将返回相应的 `Exception`。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let (head, body) = match find_head_end(buffer) {
            Some(end) => (&buffer[..end], &buffer[end + 4..]),
            None => (buffer, &buffer[buffer.len()..]),
        };

        // 1. 头部必须能转成字符串，失败则判定为非法的 HTTP 请求
        let head = match std::str::from_utf8(head) {
            Ok(s) => s,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = head.split(CRLF);
        let request_line = lines.next().unwrap_or_default();

        // 2. 解析请求行 (e.g., "GET /index.html?x=1 HTTP/1.1")
        let parts: Vec<&str> = request_line.split(' ').collect();
        if parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequest);
        }

        let method = match HttpRequestMethod::from_token(parts[0]) {
            Some(m) => m,
            None => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, parts[0]);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version_str = parts[parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能夹带空格，虽然不规范但通过 join 尝试恢复
        let target = parts[1..parts.len() - 1].join(" ");

        let mut request = Request::new(method, &target).with_id(id);
        request.version = version;

        // 3. 迭代各行解析 Headers
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                request = request.with_header(name.trim(), value.trim());
            }
        }

        // 4. 正文
        let body = match request.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
            Some(len) if len < body.len() => &body[..len],
            _ => body,
        };
        if body.is_empty() {
            return Ok(request);
        }
        Ok(request.with_body(Bytes::copy_from_slice(body)))
    }

    fn is_form(&self) -> bool {
        self.header("content-type")
            .map_or(false, |t| t.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
    }
}

/// 返回 `\r\n\r\n` 的起始下标
pub(crate) fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 获取请求路径（不含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 按名称查找头部，大小写不敏感，返回第一个匹配项
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 获取用户代理字符串
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证常规 GET 请求的解析，包括 Path、查询参数和 Headers
    #[test]
    fn test_parse_get_request() {
        let request_str = "GET /greet/Ada?lang=en HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\n\r\n";

        let request = Request::try_from(request_str.as_bytes(), 7).unwrap();

        assert_eq!(request.id(), 7);
        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(request.path(), "/greet/Ada");
        assert_eq!(request.query(), "lang=en");
        assert_eq!(request.params().get_str("lang"), Some("en"));
        assert_eq!(request.user_agent(), "Test-Browser");
    }

    /// 表单正文参数覆盖同名查询参数
    #[test]
    fn test_parse_form_post() {
        let request_str = "POST /submit?name=query&page=1 HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 9\r\n\r\nname=form";

        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Post);
        assert_eq!(request.body().as_ref(), b"name=form");
        assert_eq!(request.params().get_str("name"), Some("form"));
        assert_eq!(request.params().get_str("page"), Some("1"));
    }

    /// 先设置正文再声明表单编码，同样解析出表单参数
    #[test]
    fn test_form_params_independent_of_builder_order() {
        let header_first = Request::new(HttpRequestMethod::Post, "/f?a=query")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("a=form&b=2");
        let body_first = Request::new(HttpRequestMethod::Post, "/f?a=query")
            .with_body("a=form&b=2")
            .with_header("Content-Type", "application/x-www-form-urlencoded");

        for request in [header_first, body_first] {
            assert_eq!(request.params().get_str("a"), Some("form"));
            assert_eq!(request.params().get_str("b"), Some("2"));
        }
    }

    #[test]
    fn test_body_truncated_to_content_length() {
        let request_str = "PUT /x HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcdef";

        let request = Request::try_from(request_str.as_bytes(), 0).unwrap();

        assert_eq!(request.body().as_ref(), b"abc");
    }

    /// 非表单正文不参与参数合并
    #[test]
    fn test_json_body_not_parsed_as_params() {
        let request = Request::new(HttpRequestMethod::Post, "/x")
            .with_header("Content-Type", "application/json")
            .with_body("a=1");
        assert!(request.params().is_empty());
    }

    #[test]
    fn test_unsupported_method() {
        let result = Request::try_from(b"BREW /pot HTTP/1.1\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::UnSupportedRequestMethod);
    }

    /// 确保不支持的版本（如 HTTP/2.0）被正确拒绝
    #[test]
    fn test_unsupported_http_version() {
        let result = Request::try_from(b"GET / HTTP/2.0\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::UnsupportedHttpVersion);
    }

    #[test]
    fn test_malformed_request_line() {
        let result = Request::try_from(b"GET\r\n\r\n", 0);
        assert_eq!(result.unwrap_err(), Exception::MalformedRequest);
    }

    /// 验证 UTF-8 编码检查
    #[test]
    fn test_invalid_utf8() {
        let result = Request::try_from(&[0xFF, 0xFE, 0xFD], 0);
        assert_eq!(result.unwrap_err(), Exception::RequestIsNotUtf8);
    }

    /// 验证 Header 字段名大小写不敏感，以及方法的小写兼容
    #[test]
    fn test_case_insensitive() {
        let request = Request::try_from(b"get / HTTP/1.0\r\nuser-agent: Test\r\n\r\n", 0).unwrap();
        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(*request.version(), HttpVersion::V1_0);
        assert_eq!(request.header("User-Agent"), Some("Test"));
    }
}
