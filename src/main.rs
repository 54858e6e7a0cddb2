// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 带缓存的静态文件服务器
//!
//! 启动流程：
//! - 初始化日志（`config/log4rs.yaml`，缺失时退回到控制台输出）
//! - 载入 `config/development.toml`
//! - 按配置构建 tokio 多线程运行时
//! - 绑定端口、打印路由表并进入主事件循环
//! - 后台管理控制台（`stop` / `status` / `help`）与 Ctrl-C 均可触发停机

use std::{process, sync::Arc, time::Duration};

use log::{error, info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::Builder,
    sync::watch,
};

use cached_webserver::{server::ConnectionCounter, Config, ContentCache, Server};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const SERVER_CONFIG: &str = "config/development.toml";

fn init_logging() {
    if log4rs::init_file(LOG_CONFIG, Default::default()).is_ok() {
        return;
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}",
        )))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("无法初始化日志系统：{}", e);
            }
        }
        Err(e) => eprintln!("无法构建日志配置：{}", e),
    }
    info!("未找到{}，日志将输出到控制台", LOG_CONFIG);
}

fn main() {
    init_logging();

    let config = Config::from_toml(SERVER_CONFIG);
    info!("配置文件已载入");
    info!("public dir: {}", config.public_dir());

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .max_blocking_threads(config.max_blocking_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            process::exit(1);
        }
    };

    let exit_code = runtime.block_on(serve(config));
    // 控制台任务可能仍阻塞在标准输入上
    runtime.shutdown_timeout(Duration::from_secs(1));
    process::exit(exit_code);
}

async fn serve(config: Config) -> i32 {
    let config = Arc::new(config);
    let cache = Arc::new(ContentCache::from_config(&config));
    info!(
        "内存缓存：{}，过期时间{}ms",
        if cache.enabled() { "开启" } else { "关闭" },
        config.cache_ttl().as_millis()
    );

    let server = match Server::bind(Arc::clone(&config), Arc::clone(&cache)).await {
        Ok(server) => server,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", config.port(), e);
            return 1;
        }
    };

    println!("{}", server.dispatcher().router());
    println!("Server started: http://127.0.0.1:{}/", config.port());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    tokio::spawn({
        let shutdown_tx = Arc::clone(&shutdown_tx);
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("收到Ctrl-C，开始停机");
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => error!("无法监听Ctrl-C信号：{}", e),
            }
        }
    });
    tokio::spawn(console(Arc::clone(&shutdown_tx), server.connections(), cache));

    server.run(shutdown_rx).await;
    0
}

/// 后台管理控制台，不阻塞监听循环
async fn console(
    shutdown_tx: Arc<watch::Sender<bool>>,
    connections: ConnectionCounter,
    cache: Arc<ContentCache>,
) {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match input.trim() {
            "stop" => {
                println!("停机指令已激活，服务器将在处理完当前请求后关闭...");
                let _ = shutdown_tx.send(true);
                break;
            }
            "help" => {
                println!("== Webserver Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("====================");
            }
            "status" => {
                println!("== Webserver 状态 ===");
                println!("当前活跃连接数: {}", connections.current());
                println!("缓存条目数: {}", cache.len());
                println!("====================");
            }
            "" => {}
            cmd => println!("无效的命令：{}", cmd),
        }
    }
}
