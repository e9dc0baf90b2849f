//! 字段规范化
//!
//! 把分词器输出的原始字段映射为 [`Value`]。规则确定且无副作用，
//! 因此可以对已分词的记录集按任意粒度并行执行。

use crate::dump::pool::RowDataPool;
use crate::dump::tokenizer::Field;
use crate::dump::types::{RowData, Value};
use std::sync::Arc;

/// 行数超过该值时并行规范化
pub const PARALLEL_NORMALIZE_THRESHOLD: usize = 1000;

/// 规范化单个字段
///
/// - `NULL`（区分大小写）→ [`Value::Null`]
/// - 空串或 `''` → [`Value::Empty`]
/// - 被一对未转义单引号包围 → 去掉引号后的内容
/// - 其他 → 原样保留的字面量
pub fn normalize_field(raw: &str) -> Value {
    let raw = raw.trim();
    match raw {
        "NULL" => Value::Null,
        "" | "''" => Value::Empty,
        _ if is_quoted(raw) => Value::Quoted(raw[1..raw.len() - 1].to_string()),
        _ => Value::Literal(raw.to_string()),
    }
}

/// 规范化分词器输出的字段
///
/// 分词器已经去掉引号并把 `''` 还原为字面引号，带引号的字段内容原样保留：
/// 空内容为 [`Value::Empty`]，`'NULL'` 与裸 `NULL` 一样视为 [`Value::Null`]。
/// 未带引号的字段按 [`normalize_field`] 处理。
pub fn normalize_token(field: &Field) -> Value {
    if !field.quoted {
        return normalize_field(&field.text);
    }
    match field.text.as_str() {
        "NULL" => Value::Null,
        "" => Value::Empty,
        text => Value::Quoted(text.to_string()),
    }
}

/// 是否被一对未转义的单引号包围
fn is_quoted(raw: &str) -> bool {
    if raw.len() < 2 || !raw.starts_with('\'') || !raw.ends_with('\'') {
        return false;
    }
    // 结尾引号前连续反斜杠为奇数个时，该引号是被转义的
    let inner = &raw[1..raw.len() - 1];
    let trailing_backslashes =
        inner.bytes().rev().take_while(|b| *b == b'\\').count();
    trailing_backslashes % 2 == 0
}

/// 把一条记录的字段规范化为行数据
pub fn normalize_record(
    columns: &Arc<[String]>,
    fields: Vec<Field>,
    pool: Option<&RowDataPool>,
) -> RowData {
    let mut values = match pool {
        Some(pool) => pool.acquire(),
        None => Vec::with_capacity(columns.len()),
    };
    values.extend(fields.iter().take(columns.len()).map(normalize_token));
    RowData::new(Arc::clone(columns), values)
}

/// 规范化整批记录，保持记录顺序
///
/// 记录数超过 [`PARALLEL_NORMALIZE_THRESHOLD`] 且 `parallelism > 1` 时
/// 按连续区间分给多个线程，结果按区间顺序拼接。
pub fn normalize_rows(
    columns: &Arc<[String]>,
    records: Vec<Vec<Field>>,
    parallelism: usize,
    pool: Option<&RowDataPool>,
) -> Vec<RowData> {
    if parallelism <= 1 || records.len() <= PARALLEL_NORMALIZE_THRESHOLD {
        return records
            .into_iter()
            .map(|fields| normalize_record(columns, fields, pool))
            .collect();
    }

    let per_worker = records.len().div_ceil(parallelism);
    let mut groups: Vec<Vec<Vec<Field>>> = Vec::with_capacity(parallelism);
    let mut iter = records.into_iter().peekable();
    while iter.peek().is_some() {
        groups.push(iter.by_ref().take(per_worker).collect());
    }

    std::thread::scope(|scope| {
        let handles: Vec<_> = groups
            .into_iter()
            .map(|group| {
                scope.spawn(move || {
                    group
                        .into_iter()
                        .map(|fields| normalize_record(columns, fields, pool))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut out = Vec::new();
        for handle in handles {
            match handle.join() {
                Ok(part) => out.extend(part),
                Err(_) => tracing::error!("规范化线程异常退出"),
            }
        }
        out
    })
}
