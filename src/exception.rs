// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了分发内核自身可能产生的异常情况，分三类：
//! - **报文解析**：原始字节无法解析为合法的 HTTP 请求。
//! - **注册期校验**：路由模式、约束或具名操作在 `build()` 时未通过检查。
//! - **配置加载**：配置文件无法读取。
//!
//! 应用处理器抛出的业务错误不在这里，它们由 [`crate::error::AppError`] 承载。

use std::fmt;

/// 内核处理过程中发生的异常类型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了不在 `HTTP_VERBS` 中的方法。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本（例如：HTTP/2.0）。
    UnsupportedHttpVersion,
    /// 请求行缺失字段或结构错误。
    MalformedRequest,
    /// 路由模式非法，例如出现了空的参数名 `/user/:`。
    InvalidPattern(String),
    /// 约束中的正则表达式无法编译。
    InvalidConstraint(String),
    /// 路由或异常处理器引用了一个未注册的具名操作。
    UnknownOperation(String),
    /// 配置文件无法读取。
    ConfigUnreadable(String),
}

use Exception::*;

impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            MalformedRequest => write!(f, "Malformed request line"),
            InvalidPattern(p) => write!(f, "Invalid route pattern: {}", p),
            InvalidConstraint(c) => write!(f, "Invalid constraint: {}", c),
            UnknownOperation(name) => write!(f, "No operation named `{}` is registered", name),
            ConfigUnreadable(e) => write!(f, "Config file unreadable: {}", e),
        }
    }
}

impl std::error::Error for Exception {}
