//! 表发现
//!
//! 预扫描转储文件，列出包含 INSERT 语句的表，供交互选择或全部导出使用。
//! 不参与核心解析流水线。

use crate::config::DEFAULT_MAX_LINE_BYTES;
use crate::dump::scanner::StatementScanner;
use crate::dump::statement::{extract_table_name, is_insert};
use crate::dump::types::TableInfo;
use crate::error::Result;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// 扫描文件中的表，按表名排序
pub fn scan_tables<P: AsRef<Path>>(path: P) -> Result<Vec<TableInfo>> {
    scan_tables_with_limit(path, DEFAULT_MAX_LINE_BYTES)
}

/// 指定最大行长度扫描文件中的表
pub fn scan_tables_with_limit<P: AsRef<Path>>(
    path: P,
    max_line_bytes: usize,
) -> Result<Vec<TableInfo>> {
    let path = path.as_ref();
    tracing::debug!("开始扫描表: {}", path.display());
    let tables = collect_tables(StatementScanner::open(path, max_line_bytes)?)?;
    tracing::info!("在 {} 中发现 {} 张表", path.display(), tables.len());
    Ok(tables)
}

/// 从任意语句扫描器收集表信息
pub fn collect_tables<R: BufRead>(
    scanner: StatementScanner<R>,
) -> Result<Vec<TableInfo>> {
    let mut tables: HashMap<String, TableInfo> = HashMap::new();

    for statement in scanner {
        let statement = statement?;
        if !is_insert(&statement.text) {
            continue;
        }
        let Some(name) = extract_table_name(&statement.text) else {
            tracing::debug!("第{}行的 INSERT 语句无法识别表名", statement.line);
            continue;
        };

        tables
            .entry(name)
            .and_modify(|info| {
                info.line_to = statement.line;
                info.statements += 1;
            })
            .or_insert_with_key(|name| TableInfo {
                name: name.clone(),
                line_from: statement.line,
                line_to: statement.line,
                statements: 1,
            });
    }

    let mut tables: Vec<TableInfo> = tables.into_values().collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tables)
}
