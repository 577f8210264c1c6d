// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # webdispatch
//!
//! 最小化的 HTTP 分发内核：注册路由、前置/后置钩子与异常处理器，
//! 把请求匹配到路由，执行固定的流水线（前置钩子 → 处理器 → 后置钩子），
//! 产出 (状态码, 头部, 正文) 三元组，并按错误的精确类型解析异常。

pub mod app;
pub mod config;
pub mod error;
pub mod exception;
pub mod handler;
pub mod matcher;
pub mod param;
pub mod params;
pub mod pipeline;
pub mod request;
pub mod rescue;
pub mod response;
pub mod router;
pub mod server;

pub use app::{AppBuilder, Dispatcher};
pub use config::Config;
pub use error::AppError;
pub use exception::Exception;
pub use handler::{Flow, Handler};
pub use matcher::{Constraint, Constraints};
pub use param::HttpRequestMethod;
pub use params::{ParamValue, Params};
pub use pipeline::Scope;
pub use request::Request;
pub use response::{Body, Headers, Response, ResponseBuilder};
pub use server::Dispatch;
