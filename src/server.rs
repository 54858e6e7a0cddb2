// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务器模块
//!
//! 监听 TCP 端口，为每个连接派生一个 tokio 任务。每个连接上可以依次处理多个请求
//! （持久连接），每个请求只产生一个响应。
//!
//! 停机信号通过 `watch` 通道传入：收到信号后不再接受新连接，
//! 空闲的持久连接立即关闭，正在处理的请求会完成后再退出。

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::{
    io::{
        AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
        BufReader,
    },
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinSet,
};

use crate::{
    cache::ContentCache,
    config::Config,
    dispatcher::Dispatcher,
    exception::Exception,
    param::MAX_REQUEST_HEAD_BYTES,
    request::Request,
    response::Response,
};

/// 当前活跃连接数，供控制台的 `status` 指令读取
#[derive(Debug, Clone, Default)]
pub struct ConnectionCounter(Arc<AtomicUsize>);

impl ConnectionCounter {
    pub fn current(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn enter(&self) -> ConnectionGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard(self.clone())
    }
}

/// 离开作用域时连接计数减一
struct ConnectionGuard(ConnectionCounter);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        (self.0).0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    connections: ConnectionCounter,
    next_id: Arc<AtomicU64>,
}

impl Server {
    /// 绑定端口。`local` 为真时只监听回环地址。
    pub async fn bind(config: Arc<Config>, cache: Arc<ContentCache>) -> io::Result<Self> {
        let address = match config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        let socket = SocketAddrV4::new(address, config.port());
        let listener = TcpListener::bind(socket).await?;
        info!("服务端已在{}上监听Socket连接", listener.local_addr()?);
        Ok(Self {
            listener,
            dispatcher: Arc::new(Dispatcher::new(&config, cache)),
            connections: ConnectionCounter::default(),
            next_id: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn connections(&self) -> ConnectionCounter {
        self.connections.clone()
    }

    /// 主事件循环，直到收到停机信号，并等待所有连接任务结束后返回
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();
        loop {
            if *shutdown.borrow() {
                break;
            }
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown.changed() => break,
            };
            let (stream, addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("接受TCP连接失败：{}", e);
                    continue;
                }
            };
            debug!("新的连接：{}", addr);

            let dispatcher = Arc::clone(&self.dispatcher);
            let guard = self.connections.enter();
            let next_id = Arc::clone(&self.next_id);
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                let _guard = guard;
                handle_connection(stream, dispatcher, next_id, shutdown).await;
            });

            // 回收已经结束的任务
            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!("连接任务异常退出：{}", e);
                }
            }
        }

        info!("主循环接收到停机指令，等待{}个连接结束...", tasks.len());
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("连接任务异常退出：{}", e);
            }
        }
        info!("服务器已停止");
    }
}

/// 读取请求头的结果
enum Head {
    /// 到空行为止的完整请求头
    Complete(Vec<u8>),
    /// 对端关闭了连接，且没有读到任何字节
    Closed,
    /// 请求头超过长度限制，或者在请求头中途断开
    Invalid(Exception),
}

/// 逐行读取请求头，直到遇到空行
async fn read_head<R>(reader: &mut R) -> io::Result<Head>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::new();
    loop {
        let remaining = (MAX_REQUEST_HEAD_BYTES - head.len()) as u64;
        if remaining == 0 {
            return Ok(Head::Invalid(Exception::RequestHeadTooLarge));
        }
        let start = head.len();
        let read = (&mut *reader).take(remaining).read_until(b'\n', &mut head).await?;
        if read == 0 {
            return Ok(match head.is_empty() {
                true => Head::Closed,
                false => Head::Invalid(Exception::MalformedRequest),
            });
        }
        let line = &head[start..];
        if !line.ends_with(b"\n") {
            // 受长度限制截断，下一轮会得到 remaining == 0
            continue;
        }
        if line == b"\r\n" || line == b"\n" {
            // 请求行之前的空行忽略
            if start == 0 {
                head.clear();
                continue;
            }
            return Ok(Head::Complete(head));
        }
    }
}

/// 丢弃请求体，服务器不处理任何请求体
async fn discard_body<R>(reader: &mut R, length: u64) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    if length == 0 {
        return Ok(0);
    }
    tokio::io::copy(&mut reader.take(length), &mut tokio::io::sink()).await
}

/// 等待下一个请求头，期间收到停机信号则返回 `None`
async fn next_head<R>(
    reader: &mut R,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<io::Result<Head>>
where
    R: AsyncBufRead + Unpin,
{
    if *shutdown.borrow() {
        return None;
    }
    tokio::select! {
        head = read_head(reader) => Some(head),
        _ = shutdown.changed() => None,
    }
}

/// # 连接处理器
///
/// 负责单个 TCP 流的生命周期：循环读取请求头、丢弃请求体、解析、调度并发送响应，
/// 直到客户端关闭连接或请求不要求保持连接。
/// 回应 400，随后由调用方关闭连接。客户端可能已经断开，写入失败时记录debug日志
async fn reject<W>(writer: &mut W, id: u128) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let result = writer.write_all(&Response::response_400().as_bytes()).await;
    if let Err(e) = &result {
        debug!("[ID{}]发送400响应失败: {}", id, e);
    }
    result
}

async fn handle_connection(
    mut stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    next_id: Arc<AtomicU64>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    loop {
        let id = next_id.fetch_add(1, Ordering::SeqCst) as u128;
        let head = match next_head(&mut reader, &mut shutdown).await {
            None => {
                debug!("[ID{}]收到停机信号，关闭空闲连接", id);
                break;
            }
            Some(Ok(Head::Complete(head))) => head,
            Some(Ok(Head::Closed)) => {
                debug!("[ID{}]客户端关闭了连接", id);
                break;
            }
            Some(Ok(Head::Invalid(e))) => {
                warn!("[ID{}]{}，返回{}", id, e, e.status_code());
                let _ = reject(&mut writer, id).await;
                break;
            }
            Some(Err(e)) => {
                error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
                break;
            }
        };
        debug!("[ID{}]HTTP请求头接收完毕，{} bytes", id, head.len());
        let start_time = Instant::now();

        let request = match Request::try_from(&head, id) {
            Ok(request) => request,
            Err(e) => {
                warn!("[ID{}]解析HTTP请求失败：{}，返回{}", id, e, e.status_code());
                let _ = reject(&mut writer, id).await;
                break;
            }
        };

        if let Err(e) = discard_body(&mut reader, request.content_length()).await {
            error!("[ID{}]读取请求体时遇到错误: {}", id, e);
            break;
        }

        let keep_alive = request.is_keep_alive();
        let mut response = dispatcher.dispatch(&request, id).await;
        response.set_keep_alive(keep_alive);
        debug!(
            "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
            id,
            start_time.elapsed().as_millis()
        );

        info!(
            "[ID{}] {}, {}, {}, {}, {}, {}",
            id,
            request.version(),
            request.uri(),
            request.method(),
            response.status_code(),
            response.information(),
            request.user_agent(),
        );

        let bytes = response.as_bytes();
        if let Err(e) = writer.write_all(&bytes).await {
            error!("[ID{}]发送响应失败: {}", id, e);
            break;
        }
        if let Err(e) = writer.flush().await {
            error!("[ID{}]刷新响应失败: {}", id, e);
            break;
        }
        debug!("[ID{}]发送响应，长度: {}", id, bytes.len());

        if !keep_alive {
            break;
        }
    }
    let _ = writer.shutdown().await;
}
