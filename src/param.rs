// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Web 服务器协议参数与常量模块
//!
//! 该模块定义了服务器遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 编译期默认配置（端口、公共目录、缓存开关与过期时间等）。
//! - 本服务器会产生的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - 文件后缀名到 MIME 类型的映射表。
//! - HTTP 方法与版本的强类型枚举。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// 默认监听端口
pub const PORT: u16 = 8000;

/// 默认公共目录，`/public/:id` 路由下的文件都从这里读取
pub const PUBLIC_DIR: &str = "public/";

/// 是否启用内存文件缓存
pub const FILE_MEMORY_CACHING: bool = true;

/// 内存缓存条目的存活时间（毫秒）
pub const MEMORY_CACHE_EXPIRES_IN_MS: u64 = 60_000;

/// `Cache-Control: max-age` 与 `Expires` 使用的秒数
pub const HTTP_CACHE_SECONDS: u64 = 60;

/// HTTP 日期格式，对应 `EEE, dd MMM yyyy HH:mm:ss zzz`
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// HTTP 日期使用的时区标识
pub const HTTP_DATE_GMT_TIMEZONE: &str = "GMT";

/// 默认阻塞线程池上限，文件读取与 stat 调用都在该池中执行
pub const MAX_BLOCKING_THREADS: usize = 16;

/// 单个请求头允许的最大字节数
pub const MAX_REQUEST_HEAD_BYTES: usize = 8192;

/// 访问 `/` 与 `/public/` 时返回的固定页面
pub const FALLBACK_HTML: &str =
    "<html><body><a href='public/index.html'>index.html</a></body></html>";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(304, "Not Modified");
        map.insert(400, "Bad Request");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型（Media Type）的映射表。
    ///
    /// 用于设置响应头中的 `Content-Type` 字段。未收录的后缀使用 `application/octet-stream`。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("avif", "image/avif");
        map.insert("bmp", "image/bmp");
        map.insert("css", "text/css");
        map.insert("csv", "text/csv");
        map.insert("gif", "image/gif");
        map.insert("htm", "text/html");
        map.insert("html", "text/html");
        map.insert("ico", "image/x-icon");
        map.insert("js", "text/javascript");
        map.insert("json", "application/json");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("mjs", "text/javascript");
        map.insert("otf", "font/otf");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("txt", "text/plain");
        map.insert("ttf", "font/ttf");
        map.insert("wasm", "application/wasm");
        map.insert("webp", "image/webp");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        map.insert("xhtml", "application/xhtml+xml");
        map.insert("xml", "text/xml");
        map
    };
}

/// 根据文件后缀名查找 MIME 类型，大小写不敏感。
pub fn mime_for_extension(extension: &str) -> &'static str {
    MIME_TYPES
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or("application/octet-stream")
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    V1_0,
    V1_1,
}

/// HTTP 请求方法
///
/// 只有 `Get` 会被真正处理，其余方法一律得到 405；
/// 未知的方法名保存在 `Extension` 中以便写入访问日志。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
    Extension(String),
}

impl HttpRequestMethod {
    /// 将请求行中的方法名解析为枚举，大小写不敏感。
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "POST" => HttpRequestMethod::Post,
            "PUT" => HttpRequestMethod::Put,
            "DELETE" => HttpRequestMethod::Delete,
            "OPTIONS" => HttpRequestMethod::Options,
            "PATCH" => HttpRequestMethod::Patch,
            other => HttpRequestMethod::Extension(other.to_string()),
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "1.0"),
            HttpVersion::V1_1 => write!(f, "1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Post => write!(f, "POST"),
            HttpRequestMethod::Put => write!(f, "PUT"),
            HttpRequestMethod::Delete => write!(f, "DELETE"),
            HttpRequestMethod::Options => write!(f, "OPTIONS"),
            HttpRequestMethod::Patch => write!(f, "PATCH"),
            HttpRequestMethod::Extension(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_for_extension("css"), "text/css");
        assert_eq!(mime_for_extension("PNG"), "image/png");
        assert_eq!(mime_for_extension("html"), "text/html");
        assert_eq!(mime_for_extension("unknown_extension"), "application/octet-stream");
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(HttpRequestMethod::parse("get"), HttpRequestMethod::Get);
        assert_eq!(HttpRequestMethod::parse("DELETE"), HttpRequestMethod::Delete);
        assert_eq!(
            HttpRequestMethod::parse("BREW"),
            HttpRequestMethod::Extension("BREW".to_string())
        );
        assert_eq!(HttpRequestMethod::parse("brew").to_string(), "BREW");
    }

    #[test]
    fn test_status_codes_cover_every_response() {
        for code in [200, 304, 400, 404, 405] {
            assert!(STATUS_CODES.contains_key(&code));
        }
    }
}
