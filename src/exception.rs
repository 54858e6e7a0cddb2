// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 Web 服务器在请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖请求报文解析错误、请求语义错误（方法、查询参数）以及文件系统错误。
//! - **语义映射**：每个变体都对应一个确定的 HTTP 状态码，由 `Dispatcher` 负责转换为响应。
//! - **用户友好**：通过实现 `std::fmt::Display`，确保错误信息可以被安全地记录到日志中。

use std::fmt;

/// 服务器处理请求过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求头字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行缺少方法、路径或版本三要素之一。
    MalformedRequest,
    /// 客户端使用了服务器不支持的 HTTP 协议版本（仅支持 HTTP/1.0 与 HTTP/1.1）。
    UnsupportedHttpVersion,
    /// 请求头超过了 `MAX_REQUEST_HEAD_BYTES` 限制。
    RequestHeadTooLarge,
    /// 非 GET 请求。对应 `405 Method Not Allowed`。
    InvalidMethod,
    /// 请求携带了查询参数。对应 `400 Bad Request`。
    InvalidQuery,
    /// 文件不存在、是隐藏文件或不是普通文件。对应 `404 Not Found`。
    FileNotFound,
    /// 条件请求命中，对应 `304 Not Modified`。
    NotModified,
    /// 除"文件不存在"以外的磁盘读取错误。仅记录日志，不改变响应状态码。
    IoFailure,
}

use Exception::*;

impl Exception {
    /// 该异常最终映射到的 HTTP 状态码。
    ///
    /// `IoFailure` 不会单独产生错误响应，请求仍以 200 完成，因此映射为 200。
    pub fn status_code(&self) -> u16 {
        match self {
            RequestIsNotUtf8 | MalformedRequest | UnsupportedHttpVersion | RequestHeadTooLarge => {
                400
            }
            InvalidQuery => 400,
            InvalidMethod => 405,
            FileNotFound => 404,
            NotModified => 304,
            IoFailure => 200,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequest => write!(f, "Malformed request line"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            RequestHeadTooLarge => write!(f, "Request head too large"),
            InvalidMethod => write!(f, "Request method is not GET (405)"),
            InvalidQuery => write!(f, "Query parameters are not allowed (400)"),
            FileNotFound => write!(f, "File not found (404)"),
            NotModified => write!(f, "Not modified (304)"),
            IoFailure => write!(f, "I/O failure while reading file"),
        }
    }
}
