//! 按提交序号重排解析结果
//!
//! 工作线程的完成顺序不确定，重排器暂存提前到达的结果，
//! 只按序号连续地放行。扫描线程通过 [`SubmitWindow`] 等待放行进度，
//! 已提交未放行的语句数不超过窗口大小，暂存量因此有上限。

use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, PoisonError};

use super::types::StatementResult;

/// 结果重排器
#[derive(Debug, Default)]
pub struct ResultSequencer {
    next_sequence: u64,
    pending: BTreeMap<u64, StatementResult>,
    peak_pending: usize,
}

impl ResultSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 放入一个结果，返回因此变为可放行的结果（按序号排列）
    pub fn push(&mut self, result: StatementResult) -> Vec<StatementResult> {
        if result.sequence < self.next_sequence {
            tracing::warn!("收到重复或过期的语句结果 (序号 {})，已丢弃", result.sequence);
            return Vec::new();
        }
        self.pending.insert(result.sequence, result);
        self.peak_pending = self.peak_pending.max(self.pending.len());

        let mut ready = Vec::new();
        while let Some(result) = self.pending.remove(&self.next_sequence) {
            ready.push(result);
            self.next_sequence += 1;
        }
        ready
    }

    /// 结果队列关闭后取出剩余结果
    ///
    /// 正常情况下应为空；有解析线程异常退出时序号会出现空洞，
    /// 剩余结果仍按序号放行。
    pub fn drain_remaining(&mut self) -> Vec<StatementResult> {
        if let Some(&first) = self.pending.keys().next() {
            tracing::warn!(
                "结果序号在 {} 处中断，跳到 {} 继续放行 {} 个结果",
                self.next_sequence,
                first,
                self.pending.len()
            );
        }
        let remaining: Vec<StatementResult> =
            std::mem::take(&mut self.pending).into_values().collect();
        if let Some(last) = remaining.last() {
            self.next_sequence = last.sequence + 1;
        }
        remaining
    }

    /// 暂存中的结果数
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// 暂存结果数的历史峰值（包括刚放入随即放行的结果）
    pub fn peak_pending(&self) -> usize {
        self.peak_pending
    }

    /// 下一个期望的序号
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}

/// 提交窗口
///
/// 序号 `s` 只有在 `s < 已放行序号 + size` 时才能提交。
#[derive(Debug)]
pub struct SubmitWindow {
    size: u64,
    state: Mutex<WindowState>,
    advanced: Condvar,
}

#[derive(Debug, Default)]
struct WindowState {
    released: u64,
    closed: bool,
}

impl SubmitWindow {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1) as u64,
            state: Mutex::new(WindowState::default()),
            advanced: Condvar::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// 阻塞直到 `sequence` 进入窗口；窗口已关闭时返回 false
    pub fn wait_for(&self, sequence: u64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while !state.closed && sequence >= state.released + self.size {
            state = self
                .advanced
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !state.closed
    }

    /// 记录放行进度：序号小于 `released` 的结果都已交给聚合器
    pub fn advance(&self, released: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if released > state.released {
            state.released = released;
            self.advanced.notify_all();
        }
    }

    /// 关闭窗口，唤醒并放弃所有等待
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.advanced.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::statement::StatementOutcome;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::thread;
    use std::time::Duration;

    fn result(sequence: u64) -> StatementResult {
        StatementResult {
            sequence,
            line: sequence as usize + 1,
            outcome: Ok(StatementOutcome::Skipped),
            preview: None,
        }
    }

    fn sequences(results: &[StatementResult]) -> Vec<u64> {
        results.iter().map(|r| r.sequence).collect()
    }

    #[test]
    fn test_out_of_order_results_released_in_order() {
        let mut sequencer = ResultSequencer::new();
        assert!(sequencer.push(result(2)).is_empty());
        assert!(sequencer.push(result(1)).is_empty());
        assert_eq!(sequencer.pending(), 2);

        let ready = sequencer.push(result(0));
        assert_eq!(sequences(&ready), vec![0, 1, 2]);
        assert_eq!(sequencer.next_sequence(), 3);

        assert_eq!(sequences(&sequencer.push(result(3))), vec![3]);
        assert!(sequencer.drain_remaining().is_empty());
    }

    #[test]
    fn test_drain_remaining_skips_gaps() {
        let mut sequencer = ResultSequencer::new();
        sequencer.push(result(0));
        sequencer.push(result(3));
        sequencer.push(result(2));

        let remaining = sequencer.drain_remaining();
        assert_eq!(sequences(&remaining), vec![2, 3]);
        assert_eq!(sequencer.pending(), 0);
        assert_eq!(sequencer.next_sequence(), 4);
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let mut sequencer = ResultSequencer::new();
        sequencer.push(result(0));
        assert!(sequencer.push(result(0)).is_empty());
        assert_eq!(sequencer.pending(), 0);
    }

    #[test]
    fn test_window_blocks_until_advanced() {
        let window = Arc::new(SubmitWindow::new(2));
        assert!(window.wait_for(0));
        assert!(window.wait_for(1));

        let admitted = Arc::new(AtomicBool::new(false));
        let waiter = {
            let window = Arc::clone(&window);
            let admitted = Arc::clone(&admitted);
            thread::spawn(move || {
                let ok = window.wait_for(2);
                admitted.store(true, Ordering::SeqCst);
                ok
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!admitted.load(Ordering::SeqCst));
        window.advance(1);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_close_wakes_waiters() {
        let window = Arc::new(SubmitWindow::new(1));
        let waiter = {
            let window = Arc::clone(&window);
            thread::spawn(move || window.wait_for(10))
        };
        thread::sleep(Duration::from_millis(20));
        window.close();
        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn test_window_bounds_reordering_buffer() {
        let window = Arc::new(SubmitWindow::new(3));
        let (tx, rx) = mpsc::channel::<u64>();
        let producer = {
            let window = Arc::clone(&window);
            thread::spawn(move || {
                for sequence in 0..50 {
                    if !window.wait_for(sequence) || tx.send(sequence).is_err() {
                        break;
                    }
                }
            })
        };

        let mut sequencer = ResultSequencer::new();
        let mut released = Vec::new();
        let mut held = None;
        // 序号 0 的结果拖到其他结果都到达之后才交给重排器
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(0) => held = Some(result(0)),
                Ok(sequence) => released.extend(sequencer.push(result(sequence))),
                Err(RecvTimeoutError::Timeout) => match held.take() {
                    Some(first) => released.extend(sequencer.push(first)),
                    None => break,
                },
                Err(RecvTimeoutError::Disconnected) => break,
            }
            window.advance(sequencer.next_sequence());
        }
        window.close();
        producer.join().unwrap();
        released.extend(sequencer.drain_remaining());

        assert_eq!(sequences(&released), (0..50).collect::<Vec<u64>>());
        assert_eq!(sequencer.peak_pending(), window.size());
    }
}
