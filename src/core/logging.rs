//! 日志初始化
//!
//! 基于 `tracing` + `tracing-subscriber`。`RUST_LOG` 优先，
//! 未设置时使用 [`LoggingConfig::level`]。

use crate::config::{LogLevel, LoggingConfig};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

impl LogLevel {
    /// 转换为 `EnvFilter` 指令字符串
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()))
}

/// 初始化日志系统
///
/// 重复调用是安全的：已安装全局 subscriber 时直接返回。
/// 文件无法打开时回退到控制台输出。
pub fn init_logging(config: &LoggingConfig) {
    if config.log_to_file {
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file_path)
        {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(env_filter(config))
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                tracing::info!(target: "particles", path = %config.log_file_path, "Logging to file");
                return;
            }
            Err(e) => {
                eprintln!(
                    "Failed to open log file {}: {}, falling back to console",
                    config.log_file_path, e
                );
            }
        }
    }

    if config.log_to_console || config.log_to_file {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter(config))
            .try_init();
    }
}
