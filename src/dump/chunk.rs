//! VALUES 子句分块并行解析
//!
//! 分词器的深度与引号状态不会跨块传递，所以块边界必须落在记录之间：
//! 每块以某条记录的 `(` 开始，以某条记录的 `)` 结束。
//! 边界计算是纯函数，可以脱离分词器单独验证。

use crate::dump::tokenizer::{Field, tokenize_values};
use std::ops::Range;

/// 把 `text` 切分为约 `parts` 个互不重叠、按顺序排列的半开字节区间
///
/// 只在记录边界处切分（引号内、嵌套括号内的 `)` 不算边界）。
/// 无法得到至少两个区间时返回 None，调用方应退回单线程分词。
pub fn split_ranges(text: &str, parts: usize) -> Option<Vec<Range<usize>>> {
    if parts < 2 || text.is_empty() {
        return None;
    }

    let bytes = text.as_bytes();
    let target = bytes.len().div_ceil(parts);

    let mut ranges = Vec::with_capacity(parts);
    let mut range_start: Option<usize> = None;
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => {
                if depth == 0 && range_start.is_none() {
                    range_start = Some(i);
                }
                depth += 1;
            }
            b')' if !in_quote && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let end = i + 1;
                    let next_cut = (ranges.len() + 1) * target;
                    if ranges.len() + 1 < parts && end >= next_cut {
                        if let Some(start) = range_start.take() {
                            ranges.push(start..end);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(start) = range_start {
        ranges.push(start..bytes.len());
    }

    if ranges.len() < 2 {
        tracing::debug!(
            "无法在记录边界切分 {} 字节的 VALUES 子句，退回单线程解析",
            bytes.len()
        );
        return None;
    }
    Some(ranges)
}

/// 在作用域线程中处理每个区间，结果按区间顺序（而非完成顺序）拼接
pub fn process_chunks<T, F>(text: &str, ranges: &[Range<usize>], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&str) -> Vec<T> + Sync,
{
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = ranges
            .iter()
            .map(|range| {
                let chunk = &text[range.clone()];
                scope.spawn(move || f(chunk))
            })
            .collect();

        let mut out = Vec::new();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(part) => out.extend(part),
                Err(_) => tracing::error!("分块 {} 的解析线程异常退出", index),
            }
        }
        out
    })
}

/// 分块并行分词；无法切分时等价于 [`tokenize_values`]
pub fn tokenize_chunked(text: &str, parts: usize) -> Vec<Vec<Field>> {
    match split_ranges(text, parts) {
        Some(ranges) => {
            tracing::trace!("VALUES 子句切分为 {} 块并行分词", ranges.len());
            process_chunks(text, &ranges, tokenize_values)
        }
        None => tokenize_values(text),
    }
}
