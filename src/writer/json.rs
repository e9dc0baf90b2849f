//! JSON 写入器

use super::{DumpWriter, WriteStats};
use crate::dump::types::{Row, RowData};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// 数组中的行不重复表名
#[derive(Serialize)]
struct TableRow<'a> {
    row_number: u64,
    data: &'a RowData,
}

/// JSON 写入器
///
/// 输出 `[{"table_name":..,"rows":[..]}, ..]`，每个表区段一个对象。
pub struct JsonWriter<W: Write> {
    writer: W,
    stats: WriteStats,
    first_table: bool,
    first_row: bool,
    table_open: bool,
    closed: bool,
}

impl<W: Write> JsonWriter<W> {
    /// 创建写入器并立即写出外层数组的开头
    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_all(b"[")?;
        Ok(Self {
            writer,
            stats: WriteStats::new(),
            first_table: true,
            first_row: true,
            table_open: false,
            closed: false,
        })
    }

    /// 取回底层输出
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> DumpWriter for JsonWriter<W> {
    fn name(&self) -> &str {
        "JSON"
    }

    fn write_table_start(&mut self, table_name: &str) -> Result<()> {
        if self.table_open {
            self.write_table_end()?;
        }
        if !self.first_table {
            self.writer.write_all(b",\n")?;
        }
        self.first_table = false;
        self.first_row = true;

        self.writer.write_all(b"{\"table_name\":")?;
        serde_json::to_writer(&mut self.writer, table_name)?;
        self.writer.write_all(b",\"rows\":[")?;

        self.table_open = true;
        self.stats.tables += 1;
        Ok(())
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            if !self.first_row {
                self.writer.write_all(b",")?;
            }
            self.first_row = false;
            serde_json::to_writer(
                &mut self.writer,
                &TableRow { row_number: row.row_number, data: &row.data },
            )?;
        }
        self.writer.flush()?;

        self.stats.record_batch(rows.len());
        tracing::debug!("JSON批量写入: {} 行", rows.len());
        Ok(())
    }

    fn write_table_end(&mut self) -> Result<()> {
        if !self.table_open {
            return Ok(());
        }
        self.writer.write_all(b"]}")?;
        self.writer.flush()?;
        self.table_open = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.write_table_end()?;
        self.writer.write_all(b"]\n")?;
        self.writer.flush()?;
        self.closed = true;
        self.stats.finish();
        tracing::info!("JSON写入完成: {}", self.stats);
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
    fn test_output_is_valid_json() {
        let mut writer = JsonWriter::new(Vec::new()).unwrap();
        writer.write_table_start("users").unwrap();
        writer
            .write_rows(&[row("users", 1, &["id"], vec![Value::Literal("1".into())])])
            .unwrap();
        writer
            .write_rows(&[row("users", 2, &["id"], vec![Value::Null])])
            .unwrap();
        writer.write_table_end().unwrap();
        writer.write_table_start("orders").unwrap();
        writer
            .write_rows(&[row("orders", 1, &["id"], vec![Value::Quoted("\"q\"".into())])])
            .unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["table_name"], "users");
        assert_eq!(parsed[0]["rows"][1]["row_number"], 2);
        assert!(parsed[0]["rows"][1]["data"]["id"].is_null());
        assert_eq!(parsed[1]["rows"][0]["data"]["id"], "\"q\"");
        assert!(out.ends_with("]\n"));
    }

    #[test]
    fn test_empty_output_is_empty_array() {
        let mut writer = JsonWriter::new(Vec::new()).unwrap();
        writer.close().unwrap();
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "[]\n");
    }
}
