// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 处理器与钩子
//!
//! 路由处理器是一个带标签的变体：要么引用一个在构建器上注册过的具名操作，
//! 要么是内联闭包。两者都通过 [`invoke`] 这一个入口执行。
//!
//! 前置钩子返回 `Result<Flow, AppError>`，即继续、中止、出错三种结果；
//! 后置钩子只为副作用而存在，`Ok` 的值被丢弃。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{
    error::AppError,
    exception::Exception,
    pipeline::Scope,
    response::{Body, Response},
};

pub type HandlerFn<A> = Arc<dyn Fn(&mut Scope<A>) -> Result<Body, AppError> + Send + Sync>;
pub type BeforeHookFn<A> = Arc<dyn Fn(&mut Scope<A>) -> Result<Flow, AppError> + Send + Sync>;
pub type AfterHookFn<A> = Arc<dyn Fn(&mut Scope<A>) -> Result<(), AppError> + Send + Sync>;

/// 具名错误操作：在请求实例上执行，接收错误，返回完整响应
pub type ErrorOperationFn<A> =
    Arc<dyn Fn(&mut Scope<A>, &AppError) -> Result<Response, AppError> + Send + Sync>;

/// 内联异常处理器。类型不符时返回 `None`。
pub type RescueFn = Arc<dyn Fn(&AppError) -> Option<Result<Response, AppError>> + Send + Sync>;

/// 具名操作表
pub type Operations<A> = HashMap<String, HandlerFn<A>>;

/// 前置钩子的控制流结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// 跳过处理器与所有后置钩子，直接以当前响应状态收尾
    Abort,
}

pub enum Handler<A> {
    Named(String),
    Inline(HandlerFn<A>),
}

impl<A> Handler<A> {
    pub fn named(name: impl Into<String>) -> Self {
        Handler::Named(name.into())
    }

    pub fn inline<F>(f: F) -> Self
    where
        F: Fn(&mut Scope<A>) -> Result<Body, AppError> + Send + Sync + 'static,
    {
        Handler::Inline(Arc::new(f))
    }
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        match self {
            Handler::Named(name) => Handler::Named(name.clone()),
            Handler::Inline(f) => Handler::Inline(Arc::clone(f)),
        }
    }
}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Handler::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// 异常处理器：内联闭包，或指向具名错误操作
pub enum Rescuer {
    Named(String),
    Inline(RescueFn),
}

impl fmt::Debug for Rescuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rescuer::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Rescuer::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

/// 执行路由处理器。
///
/// 具名处理器在 `build()` 时已校验存在，这里查不到时仍以错误返回而不是 panic。
pub fn invoke<A>(
    handler: &Handler<A>,
    operations: &Operations<A>,
    scope: &mut Scope<A>,
) -> Result<Body, AppError> {
    match handler {
        Handler::Named(name) => match operations.get(name) {
            Some(operation) => operation(scope),
            None => Err(AppError::from(Exception::UnknownOperation(name.clone()))),
        },
        Handler::Inline(f) => f(scope),
    }
}
