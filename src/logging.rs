//! 日志初始化和配置模块
//!
//! 这个模块提供了统一的日志初始化功能，使用 tracing 库。
//! 控制台日志输出到 stderr，stdout 留给行数据输出；
//! 配置了日志目录时额外写入按天滚动的日志文件。

use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// 日志配置结构体
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: Level,
    /// 日志文件目录，None 表示只输出到控制台
    pub log_dir: Option<PathBuf>,
}

impl LogConfig {
    /// 创建新的日志配置，使用默认级别
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置日志级别
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// 设置日志文件目录
    pub fn log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// 从配置文件中的字符串级别构建
    pub fn from_settings(
        level: &str,
        log_dir: Option<&str>,
    ) -> LogResult<Self> {
        let level = Level::from_str(level)
            .map_err(|_| LogError::Config(format!("无效的日志级别: {level}")))?;
        Ok(Self { level, log_dir: log_dir.map(PathBuf::from) })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: Level::INFO, log_dir: None }
    }
}

static INIT_LOGGER: Once = Once::new();

/// 确保日志系统已初始化
///
/// 首次调用时使用默认配置初始化，后续调用不会重复初始化
pub fn ensure_logger_initialized() {
    INIT_LOGGER.call_once(|| {
        // 可能已经被其他地方初始化
        let _ = init_default_logging();
    });
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
    #[error("日志配置错误: {0}")]
    Config(String),
    #[error("日志初始化错误: {0}")]
    Init(String),
}

/// 日志初始化结果
pub type LogResult<T> = Result<T, LogError>;

/// 初始化日志系统
///
/// - 控制台输出到 stderr
/// - 配置了 `log_dir` 时按天滚动写入 `<log_dir>/sqldump.*`
/// - `RUST_LOG` 环境变量优先于配置的级别
///
/// 重复初始化不会报错。
///
/// # Examples
///
/// ```no_run
/// use sqldump_parser::logging::{init_logging, LogConfig};
/// use tracing::Level;
///
/// let config = LogConfig::new().level(Level::DEBUG).log_dir("logs");
/// init_logging(config).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> LogResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(SystemTime)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_ansi(true);

    let registry = Registry::default().with(env_filter).with(console_layer);

    let init_result = match config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "sqldump");
            let (non_blocking, guard) =
                tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_timer(SystemTime)
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false);

            let result = registry.with(file_layer).try_init();
            if result.is_ok() {
                // guard 必须与进程同寿命，否则缓冲的日志会丢失
                std::mem::forget(guard);
            }
            result
        }
        None => registry.try_init(),
    };

    if init_result.is_ok() {
        tracing::debug!("日志系统初始化完成");
    }
    Ok(())
}

/// 使用默认配置初始化日志系统（INFO 级别，仅控制台）
pub fn init_default_logging() -> LogResult<()> {
    init_logging(LogConfig::default())
}
