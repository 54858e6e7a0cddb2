// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 集成测试共用的工具：在临时目录上启动一个真实的服务器，并以原始 TCP 报文与其交互。

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cached_webserver::{Config, ContentCache, Server};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub addr: SocketAddr,
    /// 临时根目录；公共目录位于其中或就是它本身
    pub dir: TempDir,
    pub public: PathBuf,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// 端口 0 由系统分配，只监听回环地址
    pub async fn start(caching: bool, ttl_ms: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().to_path_buf();
        Self::launch(dir, public, caching, ttl_ms).await
    }

    /// 公共目录为临时根目录下的 `public/`，根目录中的文件不应被访问到
    pub async fn start_nested() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        std::fs::create_dir(&public).unwrap();
        Self::launch(dir, public, true, 60_000).await
    }

    async fn launch(dir: TempDir, public: PathBuf, caching: bool, ttl_ms: u64) -> Self {
        let config = Config::new()
            .with_port(0)
            .with_local(true)
            .with_public_dir(public.to_str().unwrap())
            .with_caching(caching)
            .with_cache_ttl_ms(ttl_ms);
        let cache = Arc::new(ContentCache::from_config(&config));
        let server = Server::bind(Arc::new(config), cache).await.unwrap();
        let addr = server.local_addr().unwrap();

        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(server.run(rx));
        Self {
            addr,
            dir,
            public,
            shutdown,
            handle,
        }
    }

    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.public.join(name), contents).unwrap();
    }

    /// 写入公共目录之外的文件
    pub fn write_outside(&self, name: &str, contents: &str) {
        std::fs::write(self.dir.path().join(name), contents).unwrap();
    }

    /// 在新连接上发送一个请求并读取一个响应
    pub async fn request(&self, raw: &str) -> RawResponse {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        RawResponse::read(&mut stream).await
    }

    pub async fn stop(self) {
        self.shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .unwrap();
    }
}

pub struct RawResponse {
    pub status: u16,
    /// 状态行与所有响应头（包括结尾的空行）
    pub raw_head: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// 读取一个完整响应：先读到空行，再按 `Content-Length` 读取响应体
    pub async fn read(stream: &mut TcpStream) -> Self {
        let mut head = Vec::new();
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut byte))
                .await
                .expect("timed out reading response head")
                .unwrap();
            assert_ne!(n, 0, "connection closed before response head completed");
            head.push(byte[0]);
        }
        let raw_head = String::from_utf8(head).unwrap();
        let mut lines = raw_head.split("\r\n");
        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
            .map(|(_, v)| v.parse::<usize>().unwrap())
            .unwrap_or(0);
        let mut body = vec![0u8; length];
        tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut body))
            .await
            .expect("timed out reading response body")
            .unwrap();

        Self {
            status,
            raw_head,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 服务器是否已经关闭了这个连接
pub async fn is_closed(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 1];
    match tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => true,
        _ => false,
    }
}
