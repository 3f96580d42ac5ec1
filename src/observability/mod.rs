//! 可观测性：tracing 日志初始化
//!
//! 日志统一写 stderr，MCP 服务端的 stdout 只承载协议消息。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认级别 info，可通过 RUST_LOG 覆盖
pub fn init() {
    init_with_default("info");
}

/// 指定默认过滤指令（RUST_LOG 未设置时生效）；重复初始化时忽略
pub fn init_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
