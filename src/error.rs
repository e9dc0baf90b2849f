//! 错误类型定义
//!
//! 这个模块定义了库中使用的所有错误类型，使用 thiserror 提供丰富的错误信息。
//!
//! 错误按影响范围分为三类：
//! - 文件级（`Io`、`LineTooLong`）：直接终止整个处理过程
//! - 语句级（`Statement`）：只丢弃当前语句，流水线继续
//! - 写入级（`Write`）：记录后继续处理后续批次，最终结果标记为失败

/// SQL 转储解析器的结果类型
pub type Result<T> = std::result::Result<T, SqldumpError>;

/// SQL 转储解析错误类型
#[derive(Debug, thiserror::Error)]
pub enum SqldumpError {
    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML 解析错误
    #[error("TOML解析错误: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML 序列化错误
    #[error("TOML序列化错误: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// 正则表达式错误
    #[error("正则表达式错误: {0}")]
    Regex(#[from] regex::Error),

    /// 单行超过最大缓冲长度
    #[error("第{line}行超过最大行长度限制 {limit} 字节")]
    LineTooLong { line: usize, limit: usize },

    /// 语句解析错误
    #[error("语句解析错误 (行{line}): {message}")]
    Statement { line: usize, message: String },

    /// 写入错误
    #[error("写入表 {table} 失败: {message}")]
    Write { table: String, message: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 不支持的输出格式
    #[error("不支持的输出格式: {0}")]
    UnsupportedFormat(String),

    /// 日志错误（仅在启用 logging feature 时可用）
    #[cfg(feature = "logging")]
    #[error("日志错误: {0}")]
    Log(#[from] crate::logging::LogError),

    /// 其他错误
    #[error("未知错误: {0}")]
    Other(String),
}

impl SqldumpError {
    /// 创建一个语句解析错误
    ///
    /// 行号在工作线程中尚未可知时传 0，由调用方在上报前补全。
    pub fn statement_error<S: Into<String>>(line: usize, message: S) -> Self {
        Self::Statement { line, message: message.into() }
    }

    /// 创建一个写入错误；日志由统计写入错误的一方负责
    pub fn write_error<T, S>(table: T, message: S) -> Self
    where
        T: Into<String>,
        S: Into<String>,
    {
        Self::Write { table: table.into(), message: message.into() }
    }

    /// 创建一个配置错误
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        tracing::error!("配置错误: {}", message);
        Self::Config(message)
    }

    /// 创建一个其他类型错误
    pub fn other<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        tracing::error!("未知错误: {}", message);
        Self::Other(message)
    }

    /// 为语句错误补全行号，其他错误原样返回
    pub fn with_line(self, line: usize) -> Self {
        match self {
            Self::Statement { message, .. } => Self::Statement { line, message },
            other => other,
        }
    }

    /// 检查是否为 IO 错误
    pub fn is_io_error(&self) -> bool {
        matches!(self, SqldumpError::Io(_))
    }

    /// 检查是否为语句错误
    pub fn is_statement_error(&self) -> bool {
        matches!(self, SqldumpError::Statement { .. })
    }

    /// 检查是否为写入错误
    pub fn is_write_error(&self) -> bool {
        matches!(self, SqldumpError::Write { .. })
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(self, SqldumpError::Config(_))
    }

    /// 是否为需要终止整个运行的文件级错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, SqldumpError::Io(_) | SqldumpError::LineTooLong { .. })
    }
}
