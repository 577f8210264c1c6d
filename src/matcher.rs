// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径匹配
//!
//! 路由模式与请求路径都按 `/` 切分成段，段数必须相等，不存在通配或兜底段。
//! - 字面段必须与请求段完全相等（区分大小写）。
//! - 以 `:` 开头的段是命名参数，捕获对应请求段的值，值不能为空。
//!
//! 所有段匹配后，再逐个检查捕获值的约束（精确值、候选集合或正则全匹配），
//! 任一约束失败则整条路由视为不匹配。匹配函数无副作用，可在任意线程并发调用。

use std::collections::HashMap;

use regex::Regex;

use crate::{exception::Exception, param::PARAM_SENTINEL, params::PathParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// 编译后的路由模式
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, Exception> {
        let mut segments = Vec::new();
        for part in source.split('/') {
            match part.strip_prefix(PARAM_SENTINEL) {
                Some("") => return Err(Exception::InvalidPattern(source.to_string())),
                Some(name) => segments.push(Segment::Param(name.to_string())),
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

/// 单个参数的取值约束
#[derive(Debug, Clone)]
pub enum Constraint {
    Exact(String),
    OneOf(Vec<String>),
    /// 已锚定为全匹配的正则
    Pattern(Regex),
}

impl Constraint {
    pub fn exact(value: impl Into<String>) -> Self {
        Constraint::Exact(value.into())
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// 编译正则约束，捕获值必须整体匹配
    pub fn pattern(re: &str) -> Result<Self, Exception> {
        Regex::new(&format!("^(?:{})$", re))
            .map(Constraint::Pattern)
            .map_err(|e| Exception::InvalidConstraint(e.to_string()))
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Constraint::Exact(expected) => value == expected,
            Constraint::OneOf(set) => set.iter().any(|v| v == value),
            Constraint::Pattern(re) => re.is_match(value),
        }
    }
}

/// 参数名到约束的映射
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    rules: HashMap<String, Constraint>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, constraint: Constraint) -> Self {
        self.rules.insert(name.to_string(), constraint);
        self
    }

    pub fn exact(self, name: &str, value: &str) -> Self {
        self.with(name, Constraint::exact(value))
    }

    pub fn one_of<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(name, Constraint::one_of(values))
    }

    pub fn pattern(self, name: &str, re: &str) -> Result<Self, Exception> {
        Ok(self.with(name, Constraint::pattern(re)?))
    }

    pub fn get(&self, name: &str) -> Option<&Constraint> {
        self.rules.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// 用模式与约束匹配请求路径，成功时返回捕获的参数。
pub fn match_path(pattern: &Pattern, constraints: &Constraints, path: &str) -> Option<PathParams> {
    let segments = pattern.segments();
    if path.split('/').count() != segments.len() {
        return None;
    }

    let mut params = PathParams::new();
    for (segment, part) in segments.iter().zip(path.split('/')) {
        match segment {
            Segment::Literal(literal) => {
                if literal != part {
                    return None;
                }
            }
            Segment::Param(name) => {
                params.insert(name.clone(), part.to_string());
            }
        }
    }

    let satisfied = params.iter().all(|(name, value)| {
        constraints
            .get(name)
            .map_or(true, |constraint| constraint.accepts(value))
    });
    satisfied.then_some(params)
}
