//! 并发处理流水线
//!
//! 一个扫描线程、固定数量的解析线程和一个聚合线程，由两个有界队列连接。

pub mod aggregator;
pub mod processor;
pub mod sequencer;
pub mod types;
pub mod workers;

pub use aggregator::BatchAggregator;
pub use processor::DumpProcessor;
pub use sequencer::ResultSequencer;
pub use types::{ProcessingSummary, StatementResult, StatementTask};
pub use workers::{spawn_statement_workers, statement_worker};
