//! INSERT 语句识别与解析
//!
//! 只识别单条 `INSERT INTO table (cols) VALUES (...), (...)` 形式，
//! 其他语句一律跳过（不是错误）。

use crate::dump::chunk::tokenize_chunked;
use crate::dump::normalizer::normalize_rows;
use crate::dump::pool::RowDataPool;
use crate::dump::tokenizer::tokenize_values;
use crate::dump::types::{ParsedStatement, Row, RowData};
use crate::error::{Result, SqldumpError};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

lazy_static! {
    static ref INSERT_PREFIX: Regex = Regex::new(r"(?i)^INSERT\s+INTO\b").unwrap();

    /// 表名（可带反引号/双引号/库名前缀）、列名列表与 VALUES 关键字
    static ref INSERT_HEADER: Regex = Regex::new(
        r#"(?is)^INSERT\s+INTO\s+(?P<table>(?:`[^`]+`|"[^"]+"|[^\s(`".]+)(?:\s*\.\s*(?:`[^`]+`|"[^"]+"|[^\s(`".]+))*)\s*\((?P<cols>[^)]*)\)\s*VALUES\b"#
    )
    .unwrap();

    /// 缺少列名列表时的形式，仅用于诊断
    static ref INSERT_WITHOUT_COLUMNS: Regex = Regex::new(
        r#"(?is)^INSERT\s+INTO\s+(?:`[^`]+`|"[^"]+"|[^\s(`"]+)\s*VALUES\b"#
    )
    .unwrap();

    /// 仅提取表名，用于表发现
    static ref INSERT_TABLE: Regex = Regex::new(
        r#"(?i)^INSERT\s+INTO\s+(?P<table>(?:`[^`]+`|"[^"]+"|[^\s(`".]+)(?:\s*\.\s*(?:`[^`]+`|"[^"]+"|[^\s(`".]+))*)"#
    )
    .unwrap();

    static ref VALUES_KEYWORD: Regex = Regex::new(r"(?i)\bVALUES\b").unwrap();

    static ref IDENTIFIER_PART: Regex =
        Regex::new(r#"`([^`]+)`|"([^"]+)"|([^\s.`"]+)"#).unwrap();
}

/// 语句解析选项
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// VALUES 子句超过该字节数时分块并行
    pub chunk_threshold: usize,
    /// 分块与规范化的并行度
    pub parallelism: usize,
    /// 只保留这些表，None 表示全部
    pub tables: Option<Arc<HashSet<String>>>,
    /// 行值容器池
    pub pool: Option<Arc<RowDataPool>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            chunk_threshold: crate::config::DEFAULT_CHUNK_THRESHOLD,
            parallelism: 1,
            tables: None,
            pool: None,
        }
    }
}

impl ParseOptions {
    fn accepts(&self, table: &str) -> bool {
        self.tables.as_ref().is_none_or(|set| set.contains(table))
    }
}

/// 单条语句的处理结果
#[derive(Debug)]
pub enum StatementOutcome {
    /// 不是 INSERT 语句
    Skipped,
    /// INSERT 语句，但表不在选择范围内
    Filtered { table_name: String },
    /// 解析出的行，尚未编号
    Rows { table_name: Arc<str>, rows: Vec<Row> },
}

/// INSERT 语句头部
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertHeader<'a> {
    pub table_name: String,
    pub columns: Vec<String>,
    /// VALUES 关键字之后的全部文本
    pub values: &'a str,
}

/// 去掉结尾分号和两端空白
pub fn trim_statement(statement: &str) -> &str {
    let trimmed = statement.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim()
}

/// 是否为 INSERT INTO 语句（不区分大小写）
pub fn is_insert(statement: &str) -> bool {
    INSERT_PREFIX.is_match(statement.trim_start())
}

/// 提取 INSERT 语句的表名，不校验语句其余部分
pub fn extract_table_name(statement: &str) -> Option<String> {
    let caps = INSERT_TABLE.captures(statement.trim_start())?;
    let name = unquote_identifier(caps.name("table")?.as_str());
    (!name.is_empty()).then_some(name)
}

/// 解析语句头部；不是 INSERT 语句时返回 `Ok(None)`
pub fn parse_header(statement: &str) -> Result<Option<InsertHeader<'_>>> {
    let statement = trim_statement(statement);
    if !is_insert(statement) {
        return Ok(None);
    }

    let Some(caps) = INSERT_HEADER.captures(statement) else {
        return Err(diagnose(statement));
    };

    let (Some(table), Some(cols), Some(whole)) =
        (caps.name("table"), caps.name("cols"), caps.get(0))
    else {
        return Err(diagnose(statement));
    };

    let table_name = unquote_identifier(table.as_str());
    if table_name.is_empty() {
        return Err(SqldumpError::statement_error(0, "表名为空"));
    }

    let columns = parse_column_list(cols.as_str());
    if columns.is_empty() {
        return Err(SqldumpError::statement_error(
            0,
            format!("表 {table_name} 的列名列表为空"),
        ));
    }

    Ok(Some(InsertHeader {
        table_name,
        columns,
        values: statement[whole.end()..].trim(),
    }))
}

fn diagnose(statement: &str) -> SqldumpError {
    let message = if !VALUES_KEYWORD.is_match(statement) {
        "缺少 VALUES 关键字"
    } else if INSERT_WITHOUT_COLUMNS.is_match(statement) {
        "缺少列名列表"
    } else {
        "无法识别的 INSERT 语句格式"
    };
    SqldumpError::statement_error(0, message)
}

/// 解析列名列表，去掉反引号/双引号，忽略空项
pub fn parse_column_list(columns: &str) -> Vec<String> {
    columns
        .split(',')
        .map(unquote_identifier)
        .filter(|c| !c.is_empty())
        .collect()
}

/// 去掉标识符的引号；带库名前缀时各段以 `.` 连接
pub fn unquote_identifier(identifier: &str) -> String {
    IDENTIFIER_PART
        .captures_iter(identifier.trim())
        .filter_map(|caps| {
            caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))
        })
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// 解析 INSERT 语句为未规范化的中间结果；非 INSERT 返回 `Ok(None)`
pub fn parse_insert(
    statement: &str,
    options: &ParseOptions,
) -> Result<Option<ParsedStatement>> {
    Ok(parse_header(statement)?.map(|header| tokenize_header(header, options)))
}

/// 分词 VALUES 子句，超过阈值时分块并行
fn tokenize_header(header: InsertHeader<'_>, options: &ParseOptions) -> ParsedStatement {
    let rows = if header.values.len() > options.chunk_threshold {
        tracing::trace!(
            "表 {} 的 VALUES 子句 {} 字节，尝试分块解析",
            header.table_name,
            header.values.len()
        );
        tokenize_chunked(header.values, options.parallelism)
    } else {
        tokenize_values(header.values)
    };

    ParsedStatement {
        table_name: header.table_name,
        columns: header.columns,
        rows,
    }
}

/// 解析并规范化一条语句
///
/// 产生的行带有表名但行号为 0，编号由聚合器负责。
pub fn parse_statement(
    statement: &str,
    options: &ParseOptions,
) -> Result<StatementOutcome> {
    let Some(header) = parse_header(statement)? else {
        return Ok(StatementOutcome::Skipped);
    };

    if !options.accepts(&header.table_name) {
        return Ok(StatementOutcome::Filtered { table_name: header.table_name });
    }

    let parsed = tokenize_header(header, options);
    let columns: Arc<[String]> = parsed.columns.into();
    let data: Vec<RowData> = normalize_rows(
        &columns,
        parsed.rows,
        options.parallelism,
        options.pool.as_deref(),
    );

    let table_name: Arc<str> = Arc::from(parsed.table_name);
    let rows = data
        .into_iter()
        .map(|d| Row::unnumbered(Arc::clone(&table_name), d))
        .collect();

    Ok(StatementOutcome::Rows { table_name, rows })
}
