//! 纯文本写入器

use super::{DumpWriter, WriteStats};
use crate::dump::types::Row;
use crate::error::Result;
use std::io::Write;

/// 纯文本写入器
///
/// 每张表以 `Table: name` 开头，每行以 `Row N:` 开头，随后逐列输出 `列名: 值`。
pub struct TextWriter<W: Write> {
    writer: W,
    stats: WriteStats,
    table_open: bool,
}

impl<W: Write> TextWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, stats: WriteStats::new(), table_open: false }
    }

    /// 取回底层输出
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> DumpWriter for TextWriter<W> {
    fn name(&self) -> &str {
        "TXT"
    }

    fn write_table_start(&mut self, table_name: &str) -> Result<()> {
        if self.table_open {
            self.write_table_end()?;
        }
        write!(self.writer, "\nTable: {}\n", table_name)?;
        self.writer.flush()?;
        self.table_open = true;
        self.stats.tables += 1;
        Ok(())
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            write!(self.writer, "\nRow {}:\n", row.row_number)?;
            for (column, value) in row.data.iter() {
                writeln!(self.writer, "  {}: {}", column, value)?;
            }
        }
        self.writer.flush()?;
        self.stats.record_batch(rows.len());
        Ok(())
    }

    fn write_table_end(&mut self) -> Result<()> {
        if !self.table_open {
            return Ok(());
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.table_open = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.write_table_end()?;
        self.writer.flush()?;
        self.stats.finish();
        tracing::debug!("TXT 写入完成: {}", self.stats);
        Ok(())
    }

    fn stats(&self) -> WriteStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::types::Value;
    use crate::writer::test_support::row;

    #[test]
    fn test_text_layout() {
        let mut writer = TextWriter::new(Vec::new());
        writer.write_table_start("users").unwrap();
        writer
            .write_rows(&[row(
                "users",
                1,
                &["id", "name"],
                vec![Value::Literal("1".into()), Value::Null],
            )])
            .unwrap();
        writer.close().unwrap();

        let stats = writer.stats();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "\nTable: users\n\nRow 1:\n  id: 1\n  name: NULL\n\n");
        assert_eq!(stats.rows, 1);
        assert_eq!(stats.tables, 1);
    }

    #[test]
    fn test_close_without_open_table() {
        let mut writer = TextWriter::new(Vec::new());
        writer.close().unwrap();
        assert!(writer.into_inner().is_empty());
    }
}
