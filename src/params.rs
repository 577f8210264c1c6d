// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求参数
//!
//! 参数映射的键是字符串，值是单个字符串或字符串数组（`key[]=a&key[]=b`）。
//! 合并顺序：查询串 → 表单正文 → 路径参数，后者覆盖前者。

use std::collections::HashMap;

use url::form_urlencoded;

/// 路径匹配时提取出的参数，值总是单个字符串。
pub type PathParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    /// 单值参数返回其字符串，数组参数返回 `None`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::Multi(_) => None,
        }
    }

    pub fn as_slice(&self) -> &[String] {
        match self {
            ParamValue::Single(s) => std::slice::from_ref(s),
            ParamValue::Multi(v) => v,
        }
    }
}

/// 合并后的请求参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 `application/x-www-form-urlencoded` 编码的字符串（查询串或表单正文）。
    ///
    /// 以 `[]` 结尾的键累积为数组，其余同名键后出现者覆盖先出现者。
    pub fn parse_urlencoded(input: &[u8]) -> Self {
        let mut params = Self::new();
        for (key, value) in form_urlencoded::parse(input) {
            match key.strip_suffix("[]") {
                Some(base) => params.push(base, value.into_owned()),
                None => params.insert(key.into_owned(), value.into_owned()),
            }
        }
        params
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// 取单值参数的快捷方式
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(ParamValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), ParamValue::Single(value.into()));
    }

    /// 向数组参数追加一个值；若该键原本是单值，则单值成为数组的第一个元素。
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let slot = self
            .values
            .entry(name.into())
            .or_insert_with(|| ParamValue::Multi(Vec::new()));
        let promoted = match &mut *slot {
            ParamValue::Single(s) => Some(std::mem::take(s)),
            ParamValue::Multi(_) => None,
        };
        if let Some(first) = promoted {
            *slot = ParamValue::Multi(vec![first]);
        }
        if let ParamValue::Multi(v) = slot {
            v.push(value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    /// 用 `other` 中的条目覆盖同名键
    pub fn merge(&mut self, other: Params) {
        self.values.extend(other.values);
    }

    /// 合并路径参数，同名时路径参数优先
    pub fn merge_path(&mut self, path_params: PathParams) {
        for (name, value) in path_params {
            self.values.insert(name, ParamValue::Single(value));
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_decodes_values() {
        let params = Params::parse_urlencoded(b"name=Ada+Lovelace&city=K%C3%B6ln");
        assert_eq!(params.get_str("name"), Some("Ada Lovelace"));
        assert_eq!(params.get_str("city"), Some("Köln"));
    }

    #[test]
    fn test_repeated_key_last_wins() {
        let params = Params::parse_urlencoded(b"a=1&a=2");
        assert_eq!(params.get_str("a"), Some("2"));
    }

    #[test]
    fn test_bracket_key_accumulates() {
        let params = Params::parse_urlencoded(b"tag[]=x&tag[]=y");
        assert_eq!(
            params.get("tag"),
            Some(&ParamValue::Multi(vec!["x".to_string(), "y".to_string()]))
        );
        assert_eq!(params.get_str("tag"), None);
    }

    #[test]
    fn test_push_promotes_single() {
        let mut params = Params::new();
        params.insert("k", "1");
        params.push("k", "2");
        assert_eq!(params.get("k").map(ParamValue::as_slice), Some(&["1".to_string(), "2".to_string()][..]));
    }

    #[test]
    fn test_merge_path_overwrites_and_keeps_others() {
        let mut params = Params::parse_urlencoded(b"id=query&page=2");
        let mut path = PathParams::new();
        path.insert("id".to_string(), "path".to_string());
        params.merge_path(path);
        assert_eq!(params.get_str("id"), Some("path"));
        assert_eq!(params.get_str("page"), Some("2"));
        assert_eq!(params.len(), 2);
    }
}
