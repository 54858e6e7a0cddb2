// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;
use std::time::Duration;

use crate::param::{
    FILE_MEMORY_CACHING, HTTP_CACHE_SECONDS, MAX_BLOCKING_THREADS, MEMORY_CACHE_EXPIRES_IN_MS,
    PORT, PUBLIC_DIR,
};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_public_dir")]
    public_dir: String,
    #[serde(default = "default_caching")]
    caching: bool,
    #[serde(default = "default_cache_ttl_ms")]
    cache_ttl_ms: u64,
    #[serde(default = "default_http_cache_seconds")]
    http_cache_seconds: u64,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_max_blocking_threads")]
    max_blocking_threads: usize,
    #[serde(default)]
    local: bool,
}

fn default_port() -> u16 {
    PORT
}

fn default_public_dir() -> String {
    PUBLIC_DIR.to_string()
}

fn default_caching() -> bool {
    FILE_MEMORY_CACHING
}

fn default_cache_ttl_ms() -> u64 {
    MEMORY_CACHE_EXPIRES_IN_MS
}

fn default_http_cache_seconds() -> u64 {
    HTTP_CACHE_SECONDS
}

fn default_max_blocking_threads() -> usize {
    MAX_BLOCKING_THREADS
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: default_port(),
            public_dir: default_public_dir(),
            caching: default_caching(),
            cache_ttl_ms: default_cache_ttl_ms(),
            http_cache_seconds: default_http_cache_seconds(),
            worker_threads: 0,
            max_blocking_threads: default_max_blocking_threads(),
            local: false,
        }
    }

    /// 从 TOML 文件读取配置。文件缺失或格式错误时退回编译期默认值。
    pub fn from_toml(filename: &str) -> Self {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                warn!("无法打开配置文件{}：{}，使用默认配置", filename, e);
                return Self::new().normalized();
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            error!("读取配置文件{}失败：{}，使用默认配置", filename, e);
            return Self::new().normalized();
        }
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(source: &str) -> Self {
        let raw_config: Config = match toml::from_str(source) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象：{}，使用默认配置", e);
                Config::new()
            }
        };
        raw_config.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.max_blocking_threads == 0 {
            warn!("max_blocking_threads被设置为0，该值将被改为{}", MAX_BLOCKING_THREADS);
            self.max_blocking_threads = MAX_BLOCKING_THREADS;
        }
        self
    }
}

// 测试与嵌入使用的构造方法
impl Config {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_public_dir(mut self, public_dir: impl Into<String>) -> Self {
        self.public_dir = public_dir.into();
        self
    }

    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    pub fn with_cache_ttl_ms(mut self, cache_ttl_ms: u64) -> Self {
        self.cache_ttl_ms = cache_ttl_ms;
        self
    }

    pub fn with_local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn public_dir(&self) -> &str {
        &self.public_dir
    }

    pub fn caching(&self) -> bool {
        self.caching
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn http_cache_seconds(&self) -> u64 {
        self.http_cache_seconds
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn max_blocking_threads(&self) -> usize {
        self.max_blocking_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }
}
