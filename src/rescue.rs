// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 异常解析
//!
//! 按错误的精确类型（`TypeId`）查表，不沿 `source()` 链查找：
//! 一个仅仅包裹了已注册类型的错误不会被处理。
//! 每个请求只解析一次，处理器自身返回的错误直接向外传递。

use std::any::TypeId;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use log::{debug, warn};

use crate::{
    error::AppError,
    handler::{ErrorOperationFn, Rescuer},
    pipeline::Scope,
    response::Response,
};

/// 错误类型到处理器的映射
#[derive(Debug, Default)]
pub struct ExceptionHandlerTable {
    handlers: HashMap<TypeId, Rescuer>,
}

impl ExceptionHandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册内联处理器，后注册的覆盖先注册的
    pub fn insert_inline<E, F>(&mut self, f: F)
    where
        E: Error + Send + Sync + 'static,
        F: Fn(&E) -> Result<Response, AppError> + Send + Sync + 'static,
    {
        let rescue = move |err: &AppError| err.downcast_ref::<E>().map(&f);
        self.handlers
            .insert(TypeId::of::<E>(), Rescuer::Inline(Arc::new(rescue)));
    }

    pub fn insert_named<E>(&mut self, name: &str)
    where
        E: Error + Send + Sync + 'static,
    {
        self.handlers
            .insert(TypeId::of::<E>(), Rescuer::Named(name.to_string()));
    }

    pub fn get(&self, type_id: TypeId) -> Option<&Rescuer> {
        self.handlers.get(&type_id)
    }

    /// 所有具名处理器引用的操作名
    pub fn named_operations(&self) -> impl Iterator<Item = &str> {
        self.handlers.values().filter_map(|r| match r {
            Rescuer::Named(name) => Some(name.as_str()),
            Rescuer::Inline(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// 尝试把错误解析为响应；没有对应处理器时原样返回错误。
pub(crate) fn resolve<A>(
    table: &ExceptionHandlerTable,
    error_operations: &HashMap<String, ErrorOperationFn<A>>,
    scope: &mut Scope<A>,
    err: AppError,
) -> Result<Response, AppError> {
    let id = scope.request().id();
    let rescuer = match table.get(err.type_key()) {
        Some(rescuer) => rescuer,
        None => {
            warn!("[ID{}]没有为{}注册异常处理器，错误继续向外传递：{}", id, err.type_name(), err);
            return Err(err);
        }
    };
    debug!("[ID{}]由{:?}处理{}", id, rescuer, err.type_name());

    match rescuer {
        Rescuer::Inline(f) => match f(&err) {
            Some(result) => result,
            None => Err(err),
        },
        Rescuer::Named(name) => match error_operations.get(name) {
            Some(operation) => operation(scope, &err),
            None => {
                warn!("[ID{}]异常处理器引用的操作{}不存在", id, name);
                Err(err)
            }
        },
    }
}
