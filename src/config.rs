//! 配置管理模块
//!
//! 提供统一的配置文件读取和管理功能。配置在启动时读取一次，
//! 之后以只读方式传递给解析流水线。

use crate::dump::types::OutputFormat;
use crate::error::{Result, SqldumpError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 默认批次容量
pub const DEFAULT_BATCH_SIZE: usize = 100_000;
/// VALUES 子句超过该字节数时启用分块并行解析
pub const DEFAULT_CHUNK_THRESHOLD: usize = 2 * 1024 * 1024;
/// 单行最大长度
pub const DEFAULT_MAX_LINE_BYTES: usize = 10 * 1024 * 1024;
/// 行数据对象池保留的空闲容器上限
pub const DEFAULT_POOL_CAPACITY: usize = 4096;

/// 主配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 日志配置
    #[serde(default)]
    pub log: LogSettings,
    /// 解析配置
    #[serde(default)]
    pub parser: ParserConfig,
    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
    /// 日志输出目录，不配置则只输出到控制台
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), log_dir: None }
    }
}

/// 解析流水线配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// 工作线程数，0 表示使用可用并行度
    pub worker_count: usize,
    /// 每批行数
    pub batch_size: usize,
    /// 分块并行解析阈值（字节）
    pub chunk_threshold_bytes: usize,
    /// 单行最大字节数
    pub max_line_bytes: usize,
    /// 是否按语句提交顺序聚合结果
    pub preserve_order: bool,
    /// 行数据对象池上限，0 表示不使用对象池
    pub pool_capacity: usize,
    /// 语句错误输出文件（JSONL）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors_out: Option<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            worker_count: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_threshold_bytes: DEFAULT_CHUNK_THRESHOLD,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            preserve_order: true,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            errors_out: None,
        }
    }
}

impl ParserConfig {
    /// 实际使用的工作线程数
    pub fn effective_workers(&self) -> usize {
        if self.worker_count > 0 {
            self.worker_count
        } else {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        }
    }

    /// 有界队列容量：工作线程数的两倍
    pub fn queue_capacity(&self) -> usize {
        self.effective_workers() * 2
    }
}

/// 输出配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 输出格式
    pub format: OutputFormat,
    /// 输出路径；单文件模式下为空表示 stdout，分表模式下为输出目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// 是否每张表输出一个文件
    pub split_tables: bool,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// 从字符串加载配置
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        match self.log.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(SqldumpError::config_error(format!(
                    "无效的日志级别: {}",
                    self.log.level
                )));
            }
        }

        if self.parser.batch_size == 0 {
            return Err(SqldumpError::config_error("批次大小不能为0"));
        }

        if self.parser.max_line_bytes == 0 {
            return Err(SqldumpError::config_error("最大行长度不能为0"));
        }

        let has_dir = self
            .output
            .path
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
        if self.output.split_tables && !has_dir {
            return Err(SqldumpError::config_error("分表输出必须指定输出目录"));
        }

        Ok(())
    }
}
