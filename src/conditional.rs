// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 条件请求模块
//!
//! 根据文件的最后修改时间计算指纹（ETag），并与请求中的
//! `If-None-Match` / `If-Modified-Since` 比较，决定是否可以返回 304。
//!
//! 指纹算法：`lowercase(base64(utf8(HTTP日期字符串)))`，精度为秒，
//! 同一个未修改的文件在任何时刻得到的指纹都相同。
//!
//! 注意：`If-Modified-Since` 采用**字符串完全相等**比较，而不是日期大小比较。

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, warn};
use tokio::fs;

use crate::{request::Request, util::format_system_time};

/// 由文件最后修改时间派生的指纹，每次请求重新计算，不做缓存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    last_modified: String,
    etag: String,
}

impl Fingerprint {
    pub fn from_modified(modified: SystemTime) -> Self {
        let last_modified = format_system_time(modified);
        let etag = STANDARD.encode(last_modified.as_bytes()).to_lowercase();
        Self {
            last_modified,
            etag,
        }
    }

    /// `Last-Modified` 头使用的 HTTP 日期字符串
    pub fn last_modified(&self) -> &str {
        &self.last_modified
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }
}

/// 条件判断的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional {
    /// 客户端持有的版本仍然有效，返回 304
    NotModified,
    /// 需要返回完整内容，附带用于响应头的指纹
    Proceed(Fingerprint),
    /// 文件不存在、是隐藏文件或不是普通文件
    NotFound,
}

/// 以 `.` 开头的文件名视为隐藏文件
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

/// 读取文件元数据并计算指纹。隐藏文件、目录与不存在的路径返回 `None`。
///
/// 元数据读取在 tokio 的阻塞线程池中进行。
pub async fn fingerprint(path: &Path) -> Option<Fingerprint> {
    if is_hidden(path) {
        return None;
    }
    let metadata = fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    let modified = match metadata.modified() {
        Ok(time) => time,
        Err(e) => {
            warn!("无法获取文件{}的修改时间: {}，按UNIX纪元处理", path.display(), e);
            UNIX_EPOCH
        }
    };
    Some(Fingerprint::from_modified(modified))
}

/// 评估请求的条件头。
///
/// 该函数自行执行一次 stat，与其后的文件读取之间不保证原子性。
pub async fn evaluate(request: &Request, path: &Path) -> Conditional {
    let fingerprint = match fingerprint(path).await {
        Some(f) => f,
        None => return Conditional::NotFound,
    };
    decide(
        request.if_none_match(),
        request.if_modified_since(),
        fingerprint,
    )
}

fn decide(
    if_none_match: Option<&str>,
    if_modified_since: Option<&str>,
    fingerprint: Fingerprint,
) -> Conditional {
    if let Some(tag) = if_none_match {
        if tag == fingerprint.etag() {
            debug!("If-None-Match命中: {}", tag);
            return Conditional::NotModified;
        }
    }
    if let Some(since) = if_modified_since {
        if !since.is_empty() && since == fingerprint.last_modified() {
            debug!("If-Modified-Since命中: {}", since);
            return Conditional::NotModified;
        }
    }
    Conditional::Proceed(fingerprint)
}
