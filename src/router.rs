// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由表与路由选择
//!
//! 路由表按 HTTP 方法分组，每组内保持注册顺序。选择路由时按顺序逐条匹配，
//! 第一条匹配成功的路由胜出，后面同样能匹配的路由永远不会被触达。
//! 路由表在 `build()` 之后只读，可在线程间无锁共享。

use std::collections::HashMap;

use crate::{
    handler::Handler,
    matcher::{match_path, Constraints, Pattern},
    param::HttpRequestMethod,
    params::PathParams,
};

/// 一条注册后不可变的路由
#[derive(Debug)]
pub struct RouteDefinition<A> {
    pattern: Pattern,
    constraints: Constraints,
    handler: Handler<A>,
}

impl<A> RouteDefinition<A> {
    pub fn new(pattern: Pattern, constraints: Constraints, handler: Handler<A>) -> Self {
        Self {
            pattern,
            constraints,
            handler,
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn handler(&self) -> &Handler<A> {
        &self.handler
    }

    /// 用本路由的模式与约束匹配路径
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        match_path(&self.pattern, &self.constraints, path)
    }
}

/// HTTP 方法到有序路由列表的映射
#[derive(Debug)]
pub struct RouteTable<A> {
    routes: HashMap<HttpRequestMethod, Vec<RouteDefinition<A>>>,
}

impl<A> Default for RouteTable<A> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }
}

impl<A> RouteTable<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到该方法列表的末尾
    pub fn push(&mut self, method: HttpRequestMethod, route: RouteDefinition<A>) {
        self.routes.entry(method).or_default().push(route);
    }

    pub fn routes_for(&self, method: HttpRequestMethod) -> &[RouteDefinition<A>] {
        self.routes.get(&method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HttpRequestMethod, &RouteDefinition<A>)> {
        self.routes
            .iter()
            .flat_map(|(method, list)| list.iter().map(move |route| (method, route)))
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 选出第一条匹配的路由及其路径参数。
pub fn route<'a, A>(
    table: &'a RouteTable<A>,
    method: HttpRequestMethod,
    path: &str,
) -> Option<(&'a RouteDefinition<A>, PathParams)> {
    table
        .routes_for(method)
        .iter()
        .find_map(|definition| definition.matches(path).map(|params| (definition, params)))
}
