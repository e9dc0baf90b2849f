//! 流水线相关的数据类型定义

use crate::dump::scanner::ScannedStatement;
use crate::dump::statement::StatementOutcome;
use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// 错误预览保留的最大字符数
const PREVIEW_CHARS: usize = 200;

/// 语句解析任务
#[derive(Debug, Clone)]
pub struct StatementTask {
    /// 提交序号
    pub sequence: u64,
    /// 语句起始行号
    pub line: usize,
    /// 语句文本
    pub text: String,
}

impl From<ScannedStatement> for StatementTask {
    fn from(statement: ScannedStatement) -> Self {
        Self {
            sequence: statement.sequence,
            line: statement.line,
            text: statement.text,
        }
    }
}

/// 语句解析结果，每个任务恰好产生一个
#[derive(Debug)]
pub struct StatementResult {
    /// 对应任务的提交序号
    pub sequence: u64,
    /// 语句起始行号
    pub line: usize,
    /// 解析结果
    pub outcome: Result<StatementOutcome>,
    /// 解析失败时保留的语句开头，用于错误报告
    pub preview: Option<String>,
}

impl StatementResult {
    /// 截取语句开头作为预览
    pub fn preview_of(text: &str) -> String {
        let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
        if text.chars().nth(PREVIEW_CHARS).is_some() {
            preview.push_str("...");
        }
        preview
    }
}

/// 一次完整处理的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// 收到的语句总数
    pub statements: usize,
    /// 成功解析的 INSERT 语句数
    pub inserts: usize,
    /// 非 INSERT 语句数
    pub skipped: usize,
    /// 因表过滤被忽略的 INSERT 语句数
    pub filtered: usize,
    /// 解析失败的语句数
    pub statement_errors: usize,
    /// 交给写入器的行数
    pub rows: u64,
    /// 打开过的表区段数
    pub tables: usize,
    /// 交给写入器的批次数
    pub batches: usize,
    /// 写入失败次数
    pub write_errors: usize,
    /// 重排器中同时暂存的最大结果数
    pub reorder_peak: usize,
    /// 总耗时
    pub duration: Duration,
}

impl ProcessingSummary {
    /// 是否存在需要以非零状态退出的错误
    pub fn has_write_errors(&self) -> bool {
        self.write_errors > 0
    }
}

impl fmt::Display for ProcessingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "语句: {} (INSERT {}, 跳过 {}, 过滤 {}, 错误 {}), 表: {}, 行: {}, 批次: {}, 写入错误: {}, 耗时: {:.2}s",
            self.statements,
            self.inserts,
            self.skipped,
            self.filtered,
            self.statement_errors,
            self.tables,
            self.rows,
            self.batches,
            self.write_errors,
            self.duration.as_secs_f64()
        )
    }
}
