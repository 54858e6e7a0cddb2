// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责将从 TCP 流中读取的请求头字节解析为强类型的 `Request` 结构体：
//! 1. 请求行（Request-Line）的解析（方法、请求目标、版本）。
//! 2. 标头（Headers）的提取，字段名大小写不敏感。
//! 3. 持久连接（keep-alive）的判定。

use crate::{exception::Exception, param::*};
use log::error;

/// 表示一个 HTTP 请求的元数据。
///
/// 请求体（Body）不会被保存，服务器只需要请求头即可完成路由与条件判断。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法
    method: HttpRequestMethod,
    /// 请求目标，原样保存（包含查询字符串），同时作为缓存键
    uri: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 按出现顺序保存的标头，字段名保持原样
    headers: Vec<(String, String)>,
}

impl Request {
    /// 从请求头字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 参数
    /// * `buffer` - 从 Socket 读取的请求头（到空行为止）。
    /// * `id` - 请求 ID，用于在多任务环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        // 兼容只用 LF 换行的客户端
        let mut request_lines = request_string
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line));

        // 解析请求行 (e.g., "GET /public/app.css HTTP/1.1")
        let first_line = request_lines.next().unwrap_or_default();
        let first_line_parts: Vec<&str> = first_line.split(' ').filter(|s| !s.is_empty()).collect();
        if first_line_parts.len() != 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, first_line);
            return Err(Exception::MalformedRequest);
        }

        let method = HttpRequestMethod::parse(first_line_parts[0]);
        let uri = first_line_parts[1].to_string();
        let version = match first_line_parts[2].to_ascii_uppercase().as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            other => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, other);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        let mut headers = vec![];
        for line in request_lines {
            if line.is_empty() {
                break;
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                None => {
                    error!("[ID{}]无法解析的标头行：{}", id, line);
                    return Err(Exception::MalformedRequest);
                }
            }
        }

        Ok(Self {
            method,
            uri,
            version,
            headers,
        })
    }
}

impl Request {
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// 获取请求目标（含查询参数）
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn method(&self) -> &HttpRequestMethod {
        &self.method
    }

    /// 按字段名（大小写不敏感）查找第一个匹配的标头值
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or("")
    }

    pub fn if_none_match(&self) -> Option<&str> {
        self.header("If-None-Match")
    }

    pub fn if_modified_since(&self) -> Option<&str> {
        self.header("If-Modified-Since")
    }

    /// 请求体长度，无法解析时视为 0
    pub fn content_length(&self) -> u64 {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// `Accept-Charset` 中是否列出了 `US-ASCII`
    pub fn accepts_us_ascii(&self) -> bool {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("Accept-Charset"))
            .flat_map(|(_, v)| v.split(','))
            .map(|token| token.split(';').next().unwrap_or("").trim())
            .any(|charset| charset.eq_ignore_ascii_case("US-ASCII"))
    }

    /// 请求结束后是否保持连接。
    ///
    /// HTTP/1.1 默认保持，除非出现 `Connection: close`；HTTP/1.0 只有显式 `keep-alive` 才保持。
    pub fn is_keep_alive(&self) -> bool {
        let tokens: Vec<String> = self
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("Connection"))
            .flat_map(|(_, v)| v.split(','))
            .map(|t| t.trim().to_ascii_lowercase())
            .collect();
        if tokens.iter().any(|t| t == "close") {
            return false;
        }
        match self.version {
            HttpVersion::V1_1 => true,
            HttpVersion::V1_0 => tokens.iter().any(|t| t == "keep-alive"),
        }
    }
}
