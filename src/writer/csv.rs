//! CSV 写入器

use super::{DumpWriter, WriteStats};
use crate::dump::types::Row;
use crate::error::Result;
use std::io::Write;

/// CSV 写入器
///
/// 每张表输出 `Table:,name` 一行，表头取自该表第一个批次第一行的列，
/// 表结束时输出一个空行。`NULL` 原样输出为 `NULL`，缺失的列输出为空。
pub struct CsvWriter<W: Write> {
    writer: W,
    stats: WriteStats,
    columns: Option<Vec<String>>,
    table_open: bool,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, stats: WriteStats::new(), columns: None, table_open: false }
    }

    /// 取回底层输出
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// 转义 CSV 字段
    fn escape_csv_field(field: &str) -> String {
        if field.contains(',')
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn write_record<'a, I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let line = fields
            .into_iter()
            .map(Self::escape_csv_field)
            .collect::<Vec<_>>()
            .join(",");
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// 格式化一行数据
    fn format_row(columns: &[String], row: &Row) -> Vec<String> {
        let mut fields = Vec::with_capacity(columns.len() + 1);
        fields.push(row.row_number.to_string());
        for column in columns {
            fields.push(match row.data.get(column) {
                Some(value) => value.to_string(),
                None => String::new(),
            });
        }
        fields
    }
}

impl<W: Write + Send> DumpWriter for CsvWriter<W> {
    fn name(&self) -> &str {
        "CSV"
    }

    fn write_table_start(&mut self, table_name: &str) -> Result<()> {
        if self.table_open {
            self.write_table_end()?;
        }
        self.write_record(["Table:", table_name])?;
        self.columns = None;
        self.table_open = true;
        self.stats.tables += 1;
        Ok(())
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };

        let columns = match self.columns.take() {
            Some(columns) => columns,
            None => {
                let columns: Vec<String> = first.data.keys().map(str::to_string).collect();
                let header = std::iter::once("Row").chain(columns.iter().map(String::as_str));
                self.write_record(header)?;
                columns
            }
        };

        for row in rows {
            let fields = Self::format_row(&columns, row);
            self.write_record(fields.iter().map(String::as_str))?;
        }
        self.columns = Some(columns);
        self.writer.flush()?;

        self.stats.record_batch(rows.len());
        tracing::debug!("CSV批量写入: {} 行", rows.len());
        Ok(())
    }

    fn write_table_end(&mut self) -> Result<()> {
        if !self.table_open {
            return Ok(());
        }
        self.columns = None;
        self.table_open = false;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.write_table_end()?;
        self.writer.flush()?;
        self.stats.finish();
        tracing::info!("CSV写入完成: {}", self.stats);
        Ok(())
    }

    fn stats(&self) -> WriteStats {
        self.stats.clone()
    }
}
