//! 批次聚合器
//!
//! 唯一分配行号、唯一驱动写入器表边界调用的单线程消费者。
//! 状态（当前表、当前批次、行计数器）保存在 [`BatchAggregator`] 中，
//! 同一进程内可以多次独立运行。

use crate::dump::pool::RowDataPool;
use crate::dump::statement::StatementOutcome;
use crate::dump::types::Row;
use crate::error::SqldumpError;
use crate::error_writer::ErrorWriter;
use crate::writer::DumpWriter;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{ProcessingSummary, StatementResult};

/// 批次预分配的上限
const MAX_BATCH_PREALLOC: usize = 8192;

/// 批次聚合器
pub struct BatchAggregator {
    batch_size: usize,
    current_table: Option<Arc<str>>,
    row_counter: u64,
    batch: Vec<Row>,
    /// 已关闭表区段的最后行号，表再次出现时接续编号
    finished_tables: HashMap<Arc<str>, u64>,
    pool: Option<Arc<RowDataPool>>,
    error_writer: Option<Arc<ErrorWriter>>,
    summary: ProcessingSummary,
}

impl BatchAggregator {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            current_table: None,
            row_counter: 0,
            batch: Vec::with_capacity(batch_size.min(MAX_BATCH_PREALLOC)),
            finished_tables: HashMap::new(),
            pool: None,
            error_writer: None,
            summary: ProcessingSummary::default(),
        }
    }

    /// 写出后的行值容器交回对象池
    pub fn with_pool(mut self, pool: Arc<RowDataPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// 语句错误同时写入错误文件
    pub fn with_error_writer(mut self, error_writer: Arc<ErrorWriter>) -> Self {
        self.error_writer = Some(error_writer);
        self
    }

    /// 当前打开的表
    pub fn current_table(&self) -> Option<&str> {
        self.current_table.as_deref()
    }

    /// 到目前为止的汇总
    pub fn summary(&self) -> &ProcessingSummary {
        &self.summary
    }

    /// 处理一个语句结果
    pub fn accept(&mut self, result: StatementResult, writer: &mut dyn DumpWriter) {
        self.summary.statements += 1;

        match result.outcome {
            Ok(StatementOutcome::Skipped) => {
                self.summary.skipped += 1;
            }
            Ok(StatementOutcome::Filtered { table_name }) => {
                tracing::trace!("第{}行: 表 {} 不在选择范围内", result.line, table_name);
                self.summary.filtered += 1;
            }
            Ok(StatementOutcome::Rows { table_name, rows }) => {
                self.summary.inserts += 1;
                self.switch_table(&table_name, writer);
                for mut row in rows {
                    self.row_counter += 1;
                    row.row_number = self.row_counter;
                    self.batch.push(row);
                    if self.batch.len() >= self.batch_size {
                        self.flush(writer);
                    }
                }
            }
            Err(error) => {
                self.summary.statement_errors += 1;
                tracing::warn!("第{}行语句被丢弃: {}", result.line, error);
                if let Some(error_writer) = &self.error_writer {
                    error_writer.write_error(
                        result.line,
                        result.sequence,
                        &error,
                        result.preview.as_deref(),
                    );
                }
            }
        }
    }

    /// 流结束：写出剩余批次并结束当前表
    pub fn finish(&mut self, writer: &mut dyn DumpWriter) -> ProcessingSummary {
        self.close_table(writer);
        tracing::debug!(
            "聚合完成: {} 张表区段, {} 行, {} 个批次",
            self.summary.tables,
            self.summary.rows,
            self.summary.batches
        );
        self.summary.clone()
    }

    fn switch_table(&mut self, table_name: &Arc<str>, writer: &mut dyn DumpWriter) {
        if self.current_table.as_deref() == Some(&**table_name) {
            return;
        }
        self.close_table(writer);

        self.row_counter = match self.finished_tables.get(table_name) {
            Some(&last) => {
                tracing::warn!(
                    "表 {} 的 INSERT 语句不连续，行号从 {} 继续",
                    table_name,
                    last + 1
                );
                last
            }
            None => 0,
        };

        tracing::info!("开始处理表: {}", table_name);
        if let Err(e) = writer.write_table_start(table_name) {
            self.record_write_error(table_name, &e);
        }
        self.current_table = Some(Arc::clone(table_name));
        self.summary.tables += 1;
    }

    fn close_table(&mut self, writer: &mut dyn DumpWriter) {
        self.flush(writer);
        let Some(table_name) = self.current_table.take() else {
            return;
        };
        if let Err(e) = writer.write_table_end() {
            self.record_write_error(&table_name, &e);
        }
        tracing::info!("表 {} 处理完成，共 {} 行", table_name, self.row_counter);
        self.finished_tables.insert(table_name, self.row_counter);
        self.row_counter = 0;
    }

    fn flush(&mut self, writer: &mut dyn DumpWriter) {
        if self.batch.is_empty() {
            return;
        }

        let rows = self.batch.len();
        match writer.write_rows(&self.batch) {
            Ok(()) => {
                tracing::debug!(
                    "写出批次: 表 {}, {} 行",
                    self.current_table.as_deref().unwrap_or("-"),
                    rows
                );
            }
            Err(e) => {
                let table_name = self
                    .current_table
                    .clone()
                    .unwrap_or_else(|| Arc::from("-"));
                self.record_write_error(&table_name, &e);
            }
        }
        self.summary.batches += 1;
        self.summary.rows += rows as u64;

        match &self.pool {
            Some(pool) => pool.release_rows(self.batch.drain(..)),
            None => self.batch.clear(),
        }
    }

    fn record_write_error(&mut self, table_name: &str, error: &SqldumpError) {
        self.summary.write_errors += 1;
        match error {
            SqldumpError::Write { .. } => tracing::error!("{}", error),
            other => tracing::error!("写入表 {} 失败: {}", table_name, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::types::{RowData, Value};
    use crate::error::Result;
    use crate::writer::WriteStats;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        fail_rows: bool,
    }

    impl DumpWriter for Recorder {
        fn name(&self) -> &str {
            "RECORDER"
        }
        fn write_table_start(&mut self, table_name: &str) -> Result<()> {
            self.events.push(format!("start:{table_name}"));
            Ok(())
        }
        fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
            if self.fail_rows {
                return Err(SqldumpError::write_error("t", "disk full"));
            }
            let numbers: Vec<String> = rows.iter().map(|r| r.row_number.to_string()).collect();
            self.events.push(format!("rows:{}", numbers.join(",")));
            Ok(())
        }
        fn write_table_end(&mut self) -> Result<()> {
            self.events.push("end".to_string());
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
        fn stats(&self) -> WriteStats {
            WriteStats::default()
        }
    }

    fn rows_result(sequence: u64, table: &str, count: usize) -> StatementResult {
        let table_name: Arc<str> = Arc::from(table);
        let columns: Arc<[String]> = vec!["id".to_string()].into();
        let rows = (0..count)
            .map(|i| {
                Row::unnumbered(
                    Arc::clone(&table_name),
                    RowData::new(Arc::clone(&columns), vec![Value::Literal(i.to_string())]),
                )
            })
            .collect();
        StatementResult {
            sequence,
            line: sequence as usize + 1,
            outcome: Ok(StatementOutcome::Rows { table_name, rows }),
            preview: None,
        }
    }

    fn error_result(sequence: u64) -> StatementResult {
        StatementResult {
            sequence,
            line: sequence as usize + 1,
            outcome: Err(SqldumpError::statement_error(sequence as usize + 1, "缺少 VALUES 关键字")),
            preview: Some("INSERT INTO t".to_string()),
        }
    }

    #[test]
    fn test_batches_split_at_capacity_and_table_change() {
        let mut writer = Recorder::default();
        let mut aggregator = BatchAggregator::new(2);

        aggregator.accept(rows_result(0, "users", 3), &mut writer);
        aggregator.accept(rows_result(1, "users", 1), &mut writer);
        aggregator.accept(rows_result(2, "orders", 1), &mut writer);
        let summary = aggregator.finish(&mut writer);

        assert_eq!(
            writer.events,
            vec![
                "start:users",
                "rows:1,2",
                "rows:3,4",
                "end",
                "start:orders",
                "rows:1",
                "end",
            ]
        );
        assert_eq!(summary.rows, 5);
        assert_eq!(summary.tables, 2);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.inserts, 3);
    }

    #[test]
    fn test_error_does_not_disturb_numbering() {
        let mut writer = Recorder::default();
        let mut aggregator = BatchAggregator::new(100);

        aggregator.accept(rows_result(0, "t", 2), &mut writer);
        aggregator.accept(error_result(1), &mut writer);
        aggregator.accept(rows_result(2, "t", 2), &mut writer);
        let summary = aggregator.finish(&mut writer);

        assert_eq!(writer.events, vec!["start:t", "rows:1,2,3,4", "end"]);
        assert_eq!(summary.statement_errors, 1);
        assert_eq!(summary.statements, 3);
    }

    #[test]
    fn test_reopened_table_continues_numbering() {
        let mut writer = Recorder::default();
        let mut aggregator = BatchAggregator::new(100);

        aggregator.accept(rows_result(0, "a", 2), &mut writer);
        aggregator.accept(rows_result(1, "b", 1), &mut writer);
        aggregator.accept(rows_result(2, "a", 1), &mut writer);
        aggregator.finish(&mut writer);

        assert_eq!(
            writer.events,
            vec!["start:a", "rows:1,2", "end", "start:b", "rows:1", "end", "start:a", "rows:3", "end"]
        );
    }

    #[test]
    fn test_write_errors_are_counted_and_processing_continues() {
        let mut writer = Recorder { fail_rows: true, ..Default::default() };
        let mut aggregator = BatchAggregator::new(1);

        aggregator.accept(rows_result(0, "t", 3), &mut writer);
        let summary = aggregator.finish(&mut writer);

        assert_eq!(summary.write_errors, 3);
        assert_eq!(summary.batches, 3);
        assert_eq!(writer.events, vec!["start:t", "end"]);
    }

    #[cfg(feature = "logging")]
    #[test]
    fn test_write_error_logged_once() {
        use crate::writer::test_support::SharedBuffer;

        let buffer = SharedBuffer::default();
        let sink = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();

        let mut writer = Recorder { fail_rows: true, ..Default::default() };
        tracing::subscriber::with_default(subscriber, || {
            let mut aggregator = BatchAggregator::new(10);
            aggregator.accept(rows_result(0, "t", 2), &mut writer);
            aggregator.finish(&mut writer);
        });

        let logs = buffer.contents();
        assert_eq!(logs.matches("disk full").count(), 1, "{logs}");
        assert!(!logs.contains("失败: 写入表"), "{logs}");
    }

    #[test]
    fn test_rows_returned_to_pool_after_write() {
        let pool = Arc::new(RowDataPool::new(16));
        let mut writer = Recorder::default();
        let mut aggregator = BatchAggregator::new(10).with_pool(Arc::clone(&pool));

        aggregator.accept(rows_result(0, "t", 4), &mut writer);
        assert_eq!(pool.idle(), 0);
        aggregator.finish(&mut writer);
        assert_eq!(pool.idle(), 4);
    }

    #[test]
    fn test_skipped_and_empty_insert() {
        let mut writer = Recorder::default();
        let mut aggregator = BatchAggregator::new(10);

        aggregator.accept(
            StatementResult {
                sequence: 0,
                line: 1,
                outcome: Ok(StatementOutcome::Skipped),
                preview: None,
            },
            &mut writer,
        );
        assert!(aggregator.current_table().is_none());

        aggregator.accept(rows_result(1, "empty", 0), &mut writer);
        assert_eq!(aggregator.current_table(), Some("empty"));
        let summary = aggregator.finish(&mut writer);

        assert_eq!(writer.events, vec!["start:empty", "end"]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.batches, 0);
    }
}
