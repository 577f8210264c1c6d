// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::exception::Exception;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    port: u16,
    worker_threads: usize,
    local: bool,
    #[serde(default = "default_max_request_size")]
    max_request_size: usize,
}

fn default_max_request_size() -> usize {
    65536 // 64KB
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: 7878,
            worker_threads: num_cpus::get(),
            local: true,
            max_request_size: default_max_request_size(),
        }
    }

    /// 从 TOML 文件读取配置。文件读不出来时报错；内容无法解析时记录错误并退回默认配置。
    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = File::open(filename)
            .map_err(|e| Exception::ConfigUnreadable(format!("{}: {}", filename, e)))?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)
            .map_err(|e| Exception::ConfigUnreadable(format!("{}: {}", filename, e)))?;

        let mut raw_config: Config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.max_request_size == 0 {
            warn!("max_request_size被设置为0，这将拒绝所有请求，因此该值将被改为{}。", default_max_request_size());
            raw_config.max_request_size = default_max_request_size();
        }
        Ok(raw_config)
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_from_toml_reads_fields() {
        let file = write_config("port = 9000\nworker_threads = 3\nlocal = false\nmax_request_size = 1024\n");
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.port(), 9000);
        assert_eq!(config.worker_threads(), 3);
        assert!(!config.local());
        assert_eq!(config.max_request_size(), 1024);
    }

    /// worker_threads 为 0 时按 CPU 数量自动设置，缺省的 max_request_size 取默认值
    #[test]
    fn test_from_toml_fills_defaults() {
        let file = write_config("port = 8080\nworker_threads = 0\nlocal = true\n");
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.worker_threads(), num_cpus::get());
        assert_eq!(config.max_request_size(), 65536);
    }

    #[test]
    fn test_from_toml_falls_back_on_garbage() {
        let file = write_config("this is = = not toml");
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.port(), 7878);
    }

    #[test]
    fn test_from_toml_missing_file() {
        let result = Config::from_toml("/definitely/not/here.toml");
        assert!(matches!(result, Err(Exception::ConfigUnreadable(_))));
    }
}
