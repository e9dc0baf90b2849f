//! 语句解析工作线程

use crate::dump::statement::{ParseOptions, parse_statement};
use crate::error::Result;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use super::types::{StatementResult, StatementTask};

/// 语句解析工作线程
///
/// 从共享的任务队列中取任务直到队列关闭，每个任务都向结果队列发送一个结果。
/// 返回本线程处理的语句数。
pub fn statement_worker(
    thread_id: usize,
    task_rx: Arc<Mutex<Receiver<StatementTask>>>,
    result_tx: SyncSender<StatementResult>,
    options: ParseOptions,
) -> usize {
    tracing::debug!("解析线程 {} 启动", thread_id);
    let start_time = Instant::now();
    let mut processed = 0usize;

    loop {
        // 获取下一条语句
        let task = {
            let Ok(rx) = task_rx.lock() else {
                tracing::error!("解析线程 {} 获取任务队列锁失败", thread_id);
                break;
            };
            rx.recv()
        };
        let Ok(task) = task else {
            break;
        };

        tracing::trace!(
            "解析线程 {} 处理第{}行的语句 (序号 {})",
            thread_id,
            task.line,
            task.sequence
        );

        let outcome = parse_statement(&task.text, &options).map_err(|e| e.with_line(task.line));
        let preview = outcome
            .is_err()
            .then(|| StatementResult::preview_of(&task.text));

        let result = StatementResult {
            sequence: task.sequence,
            line: task.line,
            outcome,
            preview,
        };
        processed += 1;

        if result_tx.send(result).is_err() {
            tracing::error!("解析线程 {} 发送结果失败，结果队列已关闭", thread_id);
            break;
        }
    }

    tracing::debug!(
        "解析线程 {} 结束，处理 {} 条语句，耗时: {:?}",
        thread_id,
        processed,
        start_time.elapsed()
    );
    processed
}

/// 启动固定数量的解析线程
///
/// 每个线程持有一个结果发送端；传入的 `result_tx` 在返回前被释放，
/// 所以全部线程退出后结果队列自动关闭。
pub fn spawn_statement_workers(
    worker_count: usize,
    task_rx: Receiver<StatementTask>,
    result_tx: SyncSender<StatementResult>,
    options: &ParseOptions,
) -> Result<Vec<JoinHandle<usize>>> {
    let task_rx = Arc::new(Mutex::new(task_rx));
    let worker_count = worker_count.max(1);

    tracing::info!("启动 {} 个解析线程", worker_count);

    let mut handles = Vec::with_capacity(worker_count);
    for thread_id in 0..worker_count {
        let task_rx = Arc::clone(&task_rx);
        let result_tx = result_tx.clone();
        let options = options.clone();

        let handle = thread::Builder::new()
            .name(format!("statement-worker-{thread_id}"))
            .spawn(move || statement_worker(thread_id, task_rx, result_tx, options))?;
        handles.push(handle);
    }

    Ok(handles)
}

/// 等待全部解析线程结束，返回处理的语句总数
pub fn join_workers(handles: Vec<JoinHandle<usize>>) -> usize {
    let mut total = 0;
    for (thread_id, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(processed) => total += processed,
            Err(_) => tracing::error!("解析线程 {} 异常退出", thread_id),
        }
    }
    total
}
