// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use bytes::Bytes;
use chrono::{prelude::*, Duration};
use log::error;

use crate::{conditional::Fingerprint, param::*, util::format_http_date};

#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    information: String,
    content_type: Option<String>,
    date: Option<DateTime<Utc>>,
    expires: Option<DateTime<Utc>>,
    cache_control: Option<String>,
    last_modified: Option<String>,
    etag: Option<String>,
    keep_alive: bool,
    /// `None` 表示没有响应体，同时不输出 `Content-Length`
    content: Option<Bytes>,
}

impl Response {
    fn new(code: u16) -> Self {
        let mut response = Self {
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            date: None,
            expires: None,
            cache_control: None,
            last_modified: None,
            etag: None,
            keep_alive: false,
            content: None,
        };
        response.set_code(code);
        response
    }

    fn plain_text(code: u16, body: &'static str) -> Self {
        let mut response = Self::new(code);
        response.content_type = Some("text/plain".to_string());
        response.content = Some(Bytes::from_static(body.as_bytes()));
        response
    }

    /// 200：文件内容，附带日期、缓存控制与指纹相关的响应头
    pub fn from_file(
        body: Bytes,
        mime: &str,
        fingerprint: &Fingerprint,
        http_cache_seconds: u64,
    ) -> Self {
        let mut response = Self::new(200);
        let now = Utc::now();
        response.content_type = Some(mime.to_string());
        response.date = Some(now);
        response.expires = Some(now + Duration::seconds(http_cache_seconds as i64));
        response.cache_control = Some(format!("private, max-age={}", http_cache_seconds));
        response.last_modified = Some(fingerprint.last_modified().to_string());
        response.etag = Some(fingerprint.etag().to_string());
        response.content = Some(body);
        response
    }

    /// 200：`/` 与 `/public/` 等非文件路由使用的固定页面
    pub fn fallback() -> Self {
        let mut response = Self::new(200);
        response.content_type = Some("text/html".to_string());
        response.content = Some(Bytes::from_static(FALLBACK_HTML.as_bytes()));
        response
    }

    /// 304：没有响应体，也没有内容相关的响应头
    pub fn not_modified() -> Self {
        Self::new(304)
    }

    pub fn response_400() -> Self {
        Self::plain_text(400, "400 Bad request")
    }

    pub fn response_404() -> Self {
        Self::plain_text(404, "404 File not Found")
    }

    pub fn response_405() -> Self {
        Self::plain_text(405, "405 Request method is not GET")
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&info) => info.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown".to_string()
            }
        };
        self
    }

    /// 在保持连接时添加 `Connection: keep-alive`
    pub fn set_keep_alive(&mut self, keep_alive: bool) -> &mut Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut header = format!("HTTP/1.1 {} {}{}", self.status_code, self.information, CRLF);
        let mut push = |name: &str, value: &str| {
            header.push_str(name);
            header.push_str(": ");
            header.push_str(value);
            header.push_str(CRLF);
        };
        if let Some(t) = &self.content_type {
            push("Content-Type", t);
        }
        if let Some(c) = &self.content {
            push("Content-Length", &c.len().to_string());
        }
        if let Some(d) = &self.date {
            push("Date", &format_http_date(d));
        }
        if let Some(e) = &self.expires {
            push("Expires", &format_http_date(e));
        }
        if let Some(c) = &self.cache_control {
            push("Cache-Control", c);
        }
        if let Some(l) = &self.last_modified {
            push("Last-Modified", l);
        }
        if let Some(e) = &self.etag {
            push("ETag", e);
        }
        if self.keep_alive {
            push("Connection", "keep-alive");
        }
        header.push_str(CRLF);
        let body: &[u8] = match &self.content {
            Some(c) => c.as_ref(),
            None => &[],
        };
        [header.as_bytes(), body].concat()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    pub fn cache_control(&self) -> Option<&str> {
        self.cache_control.as_deref()
    }
}
