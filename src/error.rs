// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 应用错误
//!
//! 钩子与处理器通过 `?` 抛出的任意错误都会被装箱为 [`AppError`]。
//! 装箱时记录具体类型的 `TypeId`，异常解析器只按这个精确类型查表，
//! 不会沿 `source()` 链向上寻找。
//!
//! `AppError` 本身刻意不实现 `std::error::Error`，否则与
//! `From<E: Error>` 的通用实现冲突。

use std::any::TypeId;
use std::error::Error;
use std::fmt;

/// 保留了精确类型标识的应用错误。
pub struct AppError {
    type_id: TypeId,
    type_name: &'static str,
    inner: Box<dyn Error + Send + Sync + 'static>,
}

impl AppError {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            inner: Box::new(error),
        }
    }

    /// 被装箱错误的精确类型标识
    pub fn type_key(&self) -> TypeId {
        self.type_id
    }

    /// 被装箱错误的类型名，仅用于日志
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 判断被装箱的错误是否恰好是 `E`
    pub fn is<E: Error + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<E>()
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// 取回原始错误，不做任何包装。
    pub fn into_inner(self) -> Box<dyn Error + Send + Sync + 'static> {
        self.inner
    }
}

impl<E> From<E> for AppError
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        AppError::new(error)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("type", &self.type_name)
            .field("inner", &self.inner)
            .finish()
    }
}
