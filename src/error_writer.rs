//! 语句错误写入模块 - 线程安全的 JSONL 错误记录器
//!
//! 解析失败的语句在聚合器中逐条上报，同时追加到错误文件，便于事后修复。
//! 每行一个 JSON 对象：
//!
//! ```json
//! {"line":42,"sequence":17,"error":"语句解析错误 (行42): 缺少 VALUES 关键字","preview":"INSERT INTO t (a) (1)"}
//! ```

use crate::error::SqldumpError;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 错误写入器，线程安全地将语句错误写入 JSONL 文件
///
/// 每次写入后立即刷新，程序意外退出时不会丢失已记录的错误。
pub struct ErrorWriter {
    writer: Arc<Mutex<BufWriter<std::fs::File>>>,
    path: PathBuf,
}

impl ErrorWriter {
    /// 创建新的错误写入器，追加到已有文件
    ///
    /// # Errors
    /// 当无法创建或打开输出文件时返回错误
    pub fn new<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        // 确保父目录存在
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let writer = Arc::new(Mutex::new(BufWriter::new(file)));

        Ok(Self { writer, path })
    }

    /// 写入一条语句错误
    ///
    /// 写入失败只记录日志，不中断处理流程。
    pub fn write_error(
        &self,
        line: usize,
        sequence: u64,
        error: &SqldumpError,
        preview: Option<&str>,
    ) {
        let record = json!({
            "line": line,
            "sequence": sequence,
            "error": error.to_string(),
            "preview": preview,
        });

        let Ok(mut writer) = self.writer.lock() else {
            tracing::error!("获取错误写入器锁失败");
            return;
        };

        match serde_json::to_string(&record) {
            Ok(json_str) => {
                if writeln!(writer, "{json_str}").is_err() {
                    tracing::error!("写入错误信息到文件失败: {}", self.path.display());
                }
            }
            Err(e) => tracing::error!("序列化错误信息失败: {}", e),
        }

        // 立即刷新缓冲区，确保数据写入磁盘
        if writer.flush().is_err() {
            tracing::error!("刷新错误文件缓冲区失败: {}", self.path.display());
        }
    }

    /// 获取错误文件路径
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ErrorWriter {
    fn drop(&mut self) {
        // 确保在销毁时刷新缓冲区
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
