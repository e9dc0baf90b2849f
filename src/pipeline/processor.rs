//! 转储处理器
//!
//! 扫描器（调用线程）→ 有界语句队列 → 解析线程池 → 有界结果队列 → 聚合线程 → 写入器。
//! 文件级错误终止整个运行；语句级和写入级错误只计数并上报。
//! 保持提交顺序时扫描器还受提交窗口约束，重排器暂存的结果不超过队列容量。

use crate::config::ParserConfig;
use crate::dump::pool::RowDataPool;
use crate::dump::scanner::StatementScanner;
use crate::dump::statement::ParseOptions;
use crate::error::{Result, SqldumpError};
use crate::error_writer::ErrorWriter;
use crate::writer::DumpWriter;
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use super::aggregator::BatchAggregator;
use super::sequencer::{ResultSequencer, SubmitWindow};
use super::types::{ProcessingSummary, StatementResult, StatementTask};
use super::workers::{join_workers, spawn_statement_workers};

/// 转储处理器
#[derive(Debug, Clone)]
pub struct DumpProcessor {
    config: ParserConfig,
    tables: Option<Arc<HashSet<String>>>,
}

impl DumpProcessor {
    pub fn new(config: ParserConfig) -> Self {
        Self { config, tables: None }
    }

    /// 只处理这些表的 INSERT 语句
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = tables.into_iter().map(Into::into).collect();
        self.tables = Some(Arc::new(set));
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// 处理转储文件
    ///
    /// 结束时已对最后一张表调用 `write_table_end`，`close` 由调用方负责。
    pub fn process_file<P: AsRef<Path>>(
        &self,
        path: P,
        writer: &mut dyn DumpWriter,
    ) -> Result<ProcessingSummary> {
        let path = path.as_ref();
        tracing::info!("开始处理转储文件: {}", path.display());
        let scanner = StatementScanner::open(path, self.config.max_line_bytes)?;
        self.run(scanner, writer)
    }

    /// 处理任意输入流
    pub fn process_reader<R: BufRead>(
        &self,
        reader: R,
        writer: &mut dyn DumpWriter,
    ) -> Result<ProcessingSummary> {
        self.run(StatementScanner::new(reader, self.config.max_line_bytes), writer)
    }

    fn parse_options(&self, workers: usize, pool: Option<Arc<RowDataPool>>) -> ParseOptions {
        ParseOptions {
            chunk_threshold: self.config.chunk_threshold_bytes,
            parallelism: workers,
            tables: self.tables.clone(),
            pool,
        }
    }

    fn run<R: BufRead>(
        &self,
        scanner: StatementScanner<R>,
        writer: &mut dyn DumpWriter,
    ) -> Result<ProcessingSummary> {
        let start_time = Instant::now();
        let workers = self.config.effective_workers();
        let capacity = self.config.queue_capacity();

        let pool = (self.config.pool_capacity > 0)
            .then(|| Arc::new(RowDataPool::new(self.config.pool_capacity)));
        let error_writer = match &self.config.errors_out {
            Some(path) => Some(Arc::new(ErrorWriter::new(path)?)),
            None => None,
        };

        let mut aggregator = BatchAggregator::new(self.config.batch_size);
        if let Some(pool) = &pool {
            aggregator = aggregator.with_pool(Arc::clone(pool));
        }
        if let Some(error_writer) = error_writer {
            aggregator = aggregator.with_error_writer(error_writer);
        }

        tracing::info!(
            "解析线程: {}, 队列容量: {}, 批次大小: {}, 保持提交顺序: {}",
            workers,
            capacity,
            self.config.batch_size,
            self.config.preserve_order
        );

        let (task_tx, task_rx) = mpsc::sync_channel::<StatementTask>(capacity);
        let (result_tx, result_rx) = mpsc::sync_channel::<StatementResult>(capacity);
        let handles =
            spawn_statement_workers(workers, task_rx, result_tx, &self.parse_options(workers, pool))?;

        let aborted = AtomicBool::new(false);
        let window = self
            .config
            .preserve_order
            .then(|| SubmitWindow::new(capacity));

        let (scan_result, summary) = thread::scope(|scope| {
            let aborted = &aborted;
            let window = window.as_ref();
            let aggregator_handle = scope.spawn(move || {
                let _close = window.map(WindowCloser);
                aggregate(result_rx, &mut aggregator, writer, window, aborted)
            });

            // 扫描器在调用线程上运行，队列满或超出提交窗口时阻塞
            let mut scan_result: Result<usize> = Ok(0);
            for statement in scanner {
                match statement {
                    Ok(statement) => {
                        if window.is_some_and(|w| !w.wait_for(statement.sequence)) {
                            scan_result = Err(SqldumpError::other("聚合线程已退出"));
                            break;
                        }
                        if task_tx.send(StatementTask::from(statement)).is_err() {
                            scan_result = Err(SqldumpError::other("语句队列已关闭"));
                            break;
                        }
                        if let Ok(count) = scan_result.as_mut() {
                            *count += 1;
                        }
                    }
                    Err(e) => {
                        scan_result = Err(e);
                        break;
                    }
                }
            }
            if scan_result.is_err() {
                aborted.store(true, Ordering::SeqCst);
            }

            // 关闭语句队列，等待解析线程退出后结果队列随之关闭
            drop(task_tx);
            let parsed = join_workers(handles);
            tracing::debug!("解析线程全部退出，共解析 {} 条语句", parsed);

            let summary = aggregator_handle.join().unwrap_or_else(|_| {
                tracing::error!("聚合线程异常退出");
                None
            });
            (scan_result, summary)
        });

        let submitted = match scan_result {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("处理终止: {}", e);
                return Err(e);
            }
        };

        let Some(mut summary) = summary else {
            return Err(SqldumpError::other("聚合线程异常退出"));
        };
        summary.duration = start_time.elapsed();
        if summary.statements != submitted {
            tracing::warn!("提交 {} 条语句，聚合 {} 条", submitted, summary.statements);
        }

        tracing::info!("处理完成: {}", summary);
        Ok(summary)
    }
}

/// 聚合线程退出（包括异常退出）时关闭提交窗口，避免扫描器永久等待
struct WindowCloser<'a>(&'a SubmitWindow);

impl Drop for WindowCloser<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// 聚合线程主循环
///
/// 有提交窗口时按序号重排，每放行一批就推进窗口。
/// 中止后继续排空结果队列以免解析线程阻塞，但不再写出任何内容，返回 None。
fn aggregate(
    result_rx: Receiver<StatementResult>,
    aggregator: &mut BatchAggregator,
    writer: &mut dyn DumpWriter,
    window: Option<&SubmitWindow>,
    aborted: &AtomicBool,
) -> Option<ProcessingSummary> {
    let mut sequencer = ResultSequencer::new();

    for result in result_rx.iter() {
        if aborted.load(Ordering::SeqCst) {
            continue;
        }
        match window {
            Some(window) => {
                for ready in sequencer.push(result) {
                    aggregator.accept(ready, writer);
                }
                window.advance(sequencer.next_sequence());
            }
            None => aggregator.accept(result, writer),
        }
    }

    if aborted.load(Ordering::SeqCst) {
        return None;
    }
    for ready in sequencer.drain_remaining() {
        aggregator.accept(ready, writer);
    }
    let mut summary = aggregator.finish(writer);
    summary.reorder_peak = sequencer.peak_pending();
    Some(summary)
}
