//! 行数据对象池
//!
//! 回收行值容器以减少大批量解析时的分配。契约：
//! - `acquire` 返回的容器总是空的（回收时已清空）
//! - 只有在写入器返回之后才能把行交回 `release`，
//!   写入器只借用批次，不会保留引用

use crate::dump::types::{Row, Value};
use std::sync::Mutex;

/// 新容器的默认预留列数
const DEFAULT_COLUMN_HINT: usize = 16;

/// 线程安全的行值容器池
#[derive(Debug)]
pub struct RowDataPool {
    free: Mutex<Vec<Vec<Value>>>,
    capacity: usize,
}

impl RowDataPool {
    /// `capacity` 为最多保留的空闲容器数
    pub fn new(capacity: usize) -> Self {
        Self { free: Mutex::new(Vec::with_capacity(capacity.min(1024))), capacity }
    }

    /// 取出一个空容器
    pub fn acquire(&self) -> Vec<Value> {
        let reused = match self.free.lock() {
            Ok(mut free) => free.pop(),
            Err(_) => None,
        };
        reused.unwrap_or_else(|| Vec::with_capacity(DEFAULT_COLUMN_HINT))
    }

    /// 归还容器；池满时直接丢弃
    pub fn release(&self, mut values: Vec<Value>) {
        values.clear();
        if let Ok(mut free) = self.free.lock() {
            if free.len() < self.capacity {
                free.push(values);
            }
        }
    }

    /// 回收整批已写出的行
    pub fn release_rows<I>(&self, rows: I)
    where
        I: IntoIterator<Item = Row>,
    {
        for row in rows {
            self.release(row.data.into_values());
        }
    }

    /// 当前空闲容器数
    pub fn idle(&self) -> usize {
        self.free.lock().map(|free| free.len()).unwrap_or(0)
    }
}
