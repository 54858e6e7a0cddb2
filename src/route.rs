// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由模块
//!
//! 将请求目标（URI）映射为路由目标与文件系统候选路径。
//!
//! ## 路由表
//! | 模式            | 目标         |
//! |-----------------|--------------|
//! | `/`             | `Index`      |
//! | `/public/`      | `Index`      |
//! | `/public/:id`   | `PublicFile` |
//!
//! 静态模式优先于带参数的模式匹配；均不匹配时得到 `NotFound`。
//! 路由表在启动时构建，之后只读，可被所有连接共享。

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::param::HttpRequestMethod;

/// 请求最终交给哪一类处理逻辑
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// 公共目录下的文件
    PublicFile,
    /// 首页（固定的 HTML 页面）
    Index,
    /// 未匹配任何路由
    NotFound,
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::PublicFile => write!(f, "public"),
            RouteTarget::Index => write!(f, "index"),
            RouteTarget::NotFound => write!(f, "404 Not Found"),
        }
    }
}

struct Route {
    pattern: &'static str,
    target: RouteTarget,
    matcher: Regex,
    /// 路由参数名，静态模式为 `None`
    param: Option<&'static str>,
}

impl Route {
    fn new(pattern: &'static str, target: RouteTarget) -> Result<Self, regex::Error> {
        let mut expr = String::from("^");
        let mut param = None;
        for segment in normalize(pattern).split('/').filter(|s| !s.is_empty()) {
            expr.push('/');
            match segment.strip_prefix(':') {
                Some(name) => {
                    param = Some(name);
                    expr.push_str("([^/]+)");
                }
                None => expr.push_str(&regex::escape(segment)),
            }
        }
        if expr == "^" {
            expr.push('/');
        }
        expr.push('$');
        Ok(Self {
            pattern,
            target,
            matcher: Regex::new(&expr)?,
            param,
        })
    }
}

/// 单次请求的路由结果，请求结束即丢弃
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub target: RouteTarget,
    /// `/public/:id` 中解码后的 `id`
    pub param: Option<String>,
    /// 查询参数，合法请求中必须为空
    pub query: Vec<(String, String)>,
    /// 文件系统中的候选路径，仅 `PublicFile` 有值
    pub path: Option<PathBuf>,
}

impl ResolvedRequest {
    fn not_found(query: Vec<(String, String)>) -> Self {
        Self {
            target: RouteTarget::NotFound,
            param: None,
            query,
            path: None,
        }
    }

    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }
}

pub struct Router {
    routes: Vec<Route>,
    public_dir: PathBuf,
}

impl Router {
    /// 构建固定路由表，`public_dir` 为 `/public/:id` 对应的磁盘目录。
    pub fn new(public_dir: impl AsRef<Path>) -> Self {
        // 静态模式在前，带参数的模式在后
        let table = [
            ("/", RouteTarget::Index),
            ("/public/", RouteTarget::Index),
            ("/public/:id", RouteTarget::PublicFile),
        ];
        let routes = table
            .into_iter()
            .filter_map(|(pattern, target)| Route::new(pattern, target).ok())
            .collect();
        Self {
            routes,
            public_dir: public_dir.as_ref().to_path_buf(),
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// 解析请求目标。该方法不会失败，任何无法识别的输入都得到 `NotFound`。
    pub fn resolve(&self, method: &HttpRequestMethod, uri: &str) -> ResolvedRequest {
        let (raw_path, raw_query) = match uri.split_once('?') {
            Some((p, q)) => (p, q),
            None => (uri, ""),
        };
        let query = parse_query(raw_query);

        if *method != HttpRequestMethod::Get || !raw_path.starts_with('/') {
            return ResolvedRequest::not_found(query);
        }

        let normalized = normalize(raw_path);
        for route in &self.routes {
            let captures = match route.matcher.captures(normalized) {
                Some(c) => c,
                None => continue,
            };
            debug!("URI {} 匹配路由 {}", uri, route.pattern);
            let param = match route.param {
                Some(_) => match captures.get(1).and_then(|m| decode_segment(m.as_str())) {
                    Some(id) => Some(id),
                    None => return ResolvedRequest::not_found(query),
                },
                None => None,
            };
            let path = match (route.target, &param) {
                (RouteTarget::PublicFile, Some(id)) => Some(self.public_dir.join(id)),
                _ => None,
            };
            return ResolvedRequest {
                target: route.target,
                param,
                query,
                path,
            };
        }
        ResolvedRequest::not_found(query)
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in &self.routes {
            writeln!(f, "GET     {:<16} {}", route.pattern, route.target)?;
        }
        write!(f, "*       {:<16} {}", "*", RouteTarget::NotFound)
    }
}

/// 去掉末尾的 `/`（根路径除外）
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// 解码路径参数，拒绝可能逃出公共目录的取值
fn decode_segment(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded == "." || decoded == ".." {
        return None;
    }
    if decoded.contains(|c: char| c == '/' || c == '\\' || c == '\0') {
        return None;
    }
    Some(decoded.into_owned())
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|piece| !piece.is_empty())
        .map(|piece| match piece.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (piece.to_string(), String::new()),
        })
        .collect()
}
