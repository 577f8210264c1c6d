// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 示例服务器
//!
//! 基于 Tokio 运行时的多线程服务器，用来演示分发内核：
//! - 路径参数与约束
//! - 具名操作与内联处理器
//! - 前置钩子中止流水线
//! - 按精确类型处理异常（内联与具名两种方式）
//! - 后台管理控制台（stop / help）

use std::{
    error::Error,
    fmt,
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
};

use log::{error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
    runtime::Builder,
    sync::Notify,
};

use webdispatch::{
    server, AppBuilder, AppError, Body, Config, Constraints, Dispatcher, Exception, Flow,
    Headers, HttpRequestMethod, Response, Scope,
};

#[derive(Debug)]
struct InvalidAccountError(String);

impl fmt::Display for InvalidAccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for InvalidAccountError {}

#[derive(Debug)]
struct UnknownUserError(String);

impl fmt::Display for UnknownUserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for UnknownUserError {}

/// 示例应用的状态，每个请求克隆一份
#[derive(Clone)]
struct NameApp {
    greeting: String,
}

impl NameApp {
    fn hello(scope: &mut Scope<NameApp>) -> Result<Body, AppError> {
        Ok(scope.app().greeting.clone().into())
    }

    fn respond_to_invalid_user_error(
        _scope: &mut Scope<NameApp>,
        err: &AppError,
    ) -> Result<Response, AppError> {
        let payload = serde_json::json!({ "msg": err.to_string() });
        let headers = Headers::from([("Content-Type".to_string(), "application/json".to_string())]);
        Ok(Response::new(404, headers, payload.to_string()))
    }
}

fn build_app() -> Result<Dispatcher<NameApp>, Exception> {
    let mut app = AppBuilder::new(NameApp {
        greeting: "Hello".to_string(),
    });

    // 携带 key 参数且不等于 23 时拒绝访问
    app.before(|s| {
        // 数组形式的 key 同样不等于 "23"
        if s.params().get("key").map_or(false, |key| key.as_str() != Some("23")) {
            s.response_mut().set_status(403);
            return Ok(Flow::Abort);
        }
        Ok(Flow::Continue)
    });
    app.after(|s| {
        s.headers_mut()
            .insert("X-Dispatched-By".to_string(), "webdispatch".to_string());
        Ok(())
    });

    app.operation("hello", NameApp::hello);
    app.error_operation("respond_to_invalid_user_error", NameApp::respond_to_invalid_user_error);

    app.get("/upcaser", |s| Ok(s.param("name").unwrap_or_default().to_uppercase().into()))?
        .get("/hello1", NameApp::hello)?
        .named(HttpRequestMethod::Get, "/hello2", "hello")?
        .get("/fail", |_| Ok("This should not be reached".into()))?
        .get("/secret", |_| Ok("the secret".into()))?
        .get("/greet/:name", |s| {
            Ok(format!("Hello, {}", s.param("name").unwrap_or_default()).into())
        })?
        .get_with(
            "/items/:id",
            Constraints::new().pattern("id", r"\d+")?,
            |s| Ok(format!("item #{}", s.param("id").unwrap_or_default()).into()),
        )?
        .get("/error/:id", |s| match s.param("id") {
            Some("123") => Err(InvalidAccountError("errors occurred for 123".to_string()).into()),
            Some("unknown_user") => {
                Err(UnknownUserError("invalid user id for unknown_user".to_string()).into())
            }
            _ => Ok(Body::Empty),
        })?;

    app.rescue_from(|e: &InvalidAccountError| {
        let headers = Headers::from([("Content-Type".to_string(), "plain/text".to_string())]);
        Ok(Response::new(500, headers, e.to_string()))
    });
    app.rescue_with::<UnknownUserError>("respond_to_invalid_user_error");

    app.build()
}

/// # 程序入口点
///
/// 初始化日志、加载配置、构建应用并启动主事件循环。
fn main() {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法加载日志配置config/log4rs.yaml：{}，日志将不会输出", e);
    }

    // 2. 环境配置加载
    let config = match Config::from_toml("config/development.toml") {
        Ok(config) => config,
        Err(e) => {
            warn!("{}，使用默认配置", e);
            Config::new()
        }
    };
    info!("配置文件已载入");

    // 3. 冻结应用
    let dispatcher = match build_app() {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("应用构建失败：{}", e);
            std::process::exit(1);
        }
    };

    // 4. 异步运行时定制：根据配置文件动态分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(run(config, dispatcher));
}

async fn run(config: Config, dispatcher: Dispatcher<NameApp>) {
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    let socket = SocketAddrV4::new(address, config.port());
    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", config.port(), e);
            return;
        }
    };
    info!("服务端将在{}上监听Socket连接", socket);

    // 后台管理控制台，不阻塞监听循环
    let shutdown = Arc::new(Notify::new());
    tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move {
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
                        println!("停机指令已激活，服务器将停止接收新连接...");
                        shutdown.notify_one();
                        break;
                    }
                    "help" => {
                        println!("== Webdispatch Help ==");
                        println!("stop   - 发出停机信号");
                        println!("help   - 显示此帮助信息");
                        println!("======================");
                    }
                    cmd => println!("无效的命令：{}", cmd),
                }
            }
        }
    });

    let config = Arc::new(config);
    if let Err(e) = server::serve(listener, Arc::new(dispatcher), config, shutdown.notified()).await {
        error!("服务器主循环异常退出：{}", e);
    }
    info!("服务器已停止");
}
