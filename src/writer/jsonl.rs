//! JSON Lines 写入器

use super::{DumpWriter, WriteStats};
use crate::dump::types::Row;
use crate::error::Result;
use std::io::Write;

/// 每行一个 JSON 对象，不输出表边界
pub struct JsonlWriter<W: Write> {
    writer: W,
    stats: WriteStats,
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, stats: WriteStats::new() }
    }

    /// 取回底层输出
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> DumpWriter for JsonlWriter<W> {
    fn name(&self) -> &str {
        "JSONL"
    }

    fn write_table_start(&mut self, _table_name: &str) -> Result<()> {
        self.stats.tables += 1;
        Ok(())
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            serde_json::to_writer(&mut self.writer, row)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        self.stats.record_batch(rows.len());
        Ok(())
    }

    fn write_table_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.stats.finish();
        tracing::info!("JSONL写入完成: {}", self.stats);
        Ok(())
    }

    fn stats(&self) -> WriteStats {
        self.stats.clone()
    }
}
