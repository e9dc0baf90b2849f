//! 输出写入器模块
//!
//! 聚合器通过 [`DumpWriter`] 驱动输出：每次表切换调用一次
//! `write_table_start`，随后零到多次 `write_rows`，最后 `write_table_end`。
//! 写入器只在调用期间借用批次，不保留行的引用。

use crate::dump::types::{OutputFormat, Row};
use crate::error::Result;
use std::io::{BufWriter, Write};

pub mod csv;
pub mod json;
pub mod jsonl;
pub mod multi_table;
pub mod stats;
pub mod text;

pub use csv::CsvWriter;
pub use json::JsonWriter;
pub use jsonl::JsonlWriter;
pub use multi_table::MultiTableWriter;
pub use stats::WriteStats;
pub use text::TextWriter;

/// 输出缓冲区大小
pub const OUTPUT_BUFFER_SIZE: usize = 256 * 1024;

/// 带缓冲的输出目标
pub type Output = BufWriter<Box<dyn Write + Send>>;

/// 转储输出写入器的统一接口
pub trait DumpWriter: Send {
    /// 写入器名称
    fn name(&self) -> &str;

    /// 开始一个表区段
    fn write_table_start(&mut self, table_name: &str) -> Result<()>;

    /// 写出一个非空、同表、按行号排列的批次
    fn write_rows(&mut self, rows: &[Row]) -> Result<()>;

    /// 结束当前表区段
    fn write_table_end(&mut self) -> Result<()>;

    /// 刷新并完成输出；仍有打开的表区段时先结束它
    fn close(&mut self) -> Result<()>;

    /// 获取写入统计信息
    fn stats(&self) -> WriteStats {
        WriteStats::default()
    }
}

/// 为输出目标包一层缓冲
pub fn buffered(output: Box<dyn Write + Send>) -> Output {
    BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, output)
}

/// 按格式创建写入器
pub fn create_writer(
    format: OutputFormat,
    output: Box<dyn Write + Send>,
) -> Result<Box<dyn DumpWriter>> {
    let output = buffered(output);
    tracing::debug!("创建 {} 写入器", format);

    let writer: Box<dyn DumpWriter> = match format {
        OutputFormat::Text => Box::new(TextWriter::new(output)),
        OutputFormat::Csv => Box::new(CsvWriter::new(output)),
        OutputFormat::Json => Box::new(JsonWriter::new(output)?),
        OutputFormat::Jsonl => Box::new(JsonlWriter::new(output)),
    };
    Ok(writer)
}


#[cfg(test)]
mod tests {
    use super::test_support::SharedBuffer;
    use super::*;

    #[test]
    fn test_create_writer_for_every_format() {
        for format in [
            OutputFormat::Text,
            OutputFormat::Csv,
            OutputFormat::Json,
            OutputFormat::Jsonl,
        ] {
            let buffer = SharedBuffer::default();
            let mut writer = create_writer(format, Box::new(buffer.clone())).unwrap();
            assert!(!writer.name().is_empty());
            writer.close().unwrap();
        }
    }
}
