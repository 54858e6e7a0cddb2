// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求调度模块
//!
//! 每个请求按固定顺序经过以下阶段，任一阶段都可能直接产生响应并结束处理：
//! 1. 方法检查：非 GET 返回 405。
//! 2. 路由解析。
//! 3. 查询参数检查：存在任何查询参数返回 400。
//! 4. 按路由目标分发：
//!    - `PublicFile`：条件判断（304 / 404），再按扩展名进入二进制或文本流程；
//!    - `Index` 与 `NotFound`：返回固定页面。
//! 5. 文件流程：先查缓存，未命中时读取磁盘并写入缓存。
//!
//! 每个请求恰好产生一个响应。

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, error, warn};
use tokio::fs;

use crate::{
    cache::{Content, ContentCache},
    conditional::{self, Conditional, Fingerprint},
    config::Config,
    exception::Exception,
    param::{mime_for_extension, HttpRequestMethod},
    request::Request,
    response::Response,
    route::{RouteTarget, Router},
    util::{encode_us_ascii, extension_of},
};

/// 公共文件的处理流程，由扩展名决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFlow {
    /// `.jpg` / `.png`：按原始字节读取与缓存
    Binary,
    /// `.js` / `.css`：按文本读取与缓存
    Text,
    /// 其余扩展名（包括 `.html`），同样按文本处理
    Page,
}

impl FileFlow {
    fn from_extension(extension: &str) -> Self {
        match extension {
            "jpg" | "png" => FileFlow::Binary,
            "js" | "css" => FileFlow::Text,
            _ => FileFlow::Page,
        }
    }
}

pub struct Dispatcher {
    router: Router,
    cache: Arc<ContentCache>,
    http_cache_seconds: u64,
}

impl Dispatcher {
    /// 缓存由调用方创建并注入，服务器实例持有其所有权
    pub fn new(config: &Config, cache: Arc<ContentCache>) -> Self {
        Self {
            router: Router::new(config.public_dir()),
            cache,
            http_cache_seconds: config.http_cache_seconds(),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub async fn dispatch(&self, request: &Request, id: u128) -> Response {
        if *request.method() != HttpRequestMethod::Get {
            warn!("[ID{}]{}：{}，返回405", id, Exception::InvalidMethod, request.method());
            return Response::response_405();
        }

        let resolved = self.router.resolve(request.method(), request.uri());
        debug!("[ID{}]路由目标：{}", id, resolved.target);

        if resolved.has_query() {
            warn!("[ID{}]{}：{}，返回400", id, Exception::InvalidQuery, request.uri());
            return Response::response_400();
        }

        match resolved.target {
            RouteTarget::PublicFile => match (resolved.param, resolved.path) {
                (Some(id_param), Some(path)) => {
                    self.public_file(request, &id_param, &path, id).await
                }
                _ => Response::fallback(),
            },
            RouteTarget::Index | RouteTarget::NotFound => Response::fallback(),
        }
    }

    async fn public_file(&self, request: &Request, name: &str, path: &Path, id: u128) -> Response {
        let fingerprint = match conditional::evaluate(request, path).await {
            Conditional::NotModified => {
                debug!("[ID{}]{}，返回304", id, Exception::NotModified);
                return Response::not_modified();
            }
            Conditional::NotFound => {
                warn!("[ID{}]请求的文件：{} 不存在，返回404", id, path.display());
                return Response::response_404();
            }
            Conditional::Proceed(fingerprint) => fingerprint,
        };

        let extension = extension_of(name);
        let mime = mime_for_extension(&extension);
        let flow = FileFlow::from_extension(&extension);
        debug!("[ID{}]文件{}的处理流程：{:?}，MIME：{}", id, name, flow, mime);

        // 命中缓存时使用写入缓存时的指纹，保证内容与 ETag 一致
        let body = match flow {
            FileFlow::Binary => self.binary_body(request.uri(), path, fingerprint, id).await,
            FileFlow::Text | FileFlow::Page => self
                .text_body(request.uri(), path, fingerprint, id)
                .await
                .map(|(text, fingerprint)| {
                    let bytes = if request.accepts_us_ascii() {
                        Bytes::from(encode_us_ascii(&text))
                    } else {
                        Bytes::from(text)
                    };
                    (bytes, fingerprint)
                }),
        };

        match body {
            Ok((body, fingerprint)) => {
                Response::from_file(body, mime, &fingerprint, self.http_cache_seconds)
            }
            Err(_) => Response::response_404(),
        }
    }

    async fn binary_body(
        &self,
        uri: &str,
        path: &Path,
        fingerprint: Fingerprint,
        id: u128,
    ) -> Result<(Bytes, Fingerprint), Exception> {
        if let Some((bytes, stored)) = self.cache.lookup_binary(uri) {
            debug!("[ID{}]缓存命中：{}，{} bytes", id, uri, bytes.len());
            return Ok((bytes, stored));
        }
        debug!("[ID{}]缓存未命中，读取文件: {}", id, path.display());
        match read_file(path, id).await {
            Ok(contents) => {
                let bytes = Bytes::from(contents);
                self.cache
                    .store(uri, Content::Binary(bytes.clone()), fingerprint.clone());
                Ok((bytes, fingerprint))
            }
            Err(Exception::IoFailure) => Ok((Bytes::new(), fingerprint)),
            Err(e) => Err(e),
        }
    }

    async fn text_body(
        &self,
        uri: &str,
        path: &Path,
        fingerprint: Fingerprint,
        id: u128,
    ) -> Result<(String, Fingerprint), Exception> {
        if let Some((text, stored)) = self.cache.lookup_text(uri) {
            debug!("[ID{}]缓存命中：{}，{} bytes", id, uri, text.len());
            return Ok((text, stored));
        }
        debug!("[ID{}]缓存未命中，读取文件: {}", id, path.display());
        match read_file(path, id).await {
            Ok(contents) => {
                let text = String::from_utf8_lossy(&contents).into_owned();
                self.cache
                    .store(uri, Content::Text(text.clone()), fingerprint.clone());
                Ok((text, fingerprint))
            }
            Err(Exception::IoFailure) => Ok((String::new(), fingerprint)),
            Err(e) => Err(e),
        }
    }
}

/// 通过 `tokio::fs` 读取文件，实际的阻塞读取发生在阻塞线程池中
async fn read_file(path: &Path, id: u128) -> Result<Vec<u8>, Exception> {
    match fs::read(path).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("[ID{}]文件{}在读取前被删除", id, path.display());
            Err(Exception::FileNotFound)
        }
        Err(e) => {
            error!("[ID{}]无法读取文件{}。错误：{}", id, path.display(), e);
            Err(Exception::IoFailure)
        }
    }
}
