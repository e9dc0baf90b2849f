//! 集成测试公共模块
#![allow(dead_code)]

use sqldump_parser::dump::types::Row;
use sqldump_parser::error::Result;
use sqldump_parser::writer::{DumpWriter, WriteStats};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// 创建测试用的转储文件
pub fn create_test_dump(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(filename);
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}

/// 初始化测试日志（重复调用无副作用）
pub fn init_test_logging() {
    sqldump_parser::logging::ensure_logger_initialized();
}

/// 两张表的标准转储内容
pub const SAMPLE_DUMP: &str = "\
-- MySQL dump
SET NAMES utf8mb4;
CREATE TABLE `users` (`id` int, `name` varchar(32));
INSERT INTO `users` (`id`,`name`) VALUES (1,'a'),(2,'b');
INSERT INTO `orders` (`id`) VALUES (10);
";

/// 同一张表由多条语句组成的大转储
pub fn many_statements_dump(table: &str, statements: usize, rows_per_statement: usize) -> String {
    let mut out = String::new();
    let mut id = 0usize;
    for _ in 0..statements {
        let values: Vec<String> = (0..rows_per_statement)
            .map(|_| {
                id += 1;
                format!("({id},'name {id}, quoted \\'x\\'',NULL)")
            })
            .collect();
        out.push_str(&format!(
            "INSERT INTO `{table}` (`id`,`name`,`note`) VALUES {};\n",
            values.join(",")
        ));
    }
    out
}

/// 记录写入器收到的每次调用
#[derive(Default)]
pub struct RecordingWriter {
    pub events: Vec<Event>,
    pub closed: bool,
    open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start(String),
    Rows(Vec<Row>),
    End,
}

impl RecordingWriter {
    /// 所有批次中的行，按写出顺序
    pub fn rows(&self) -> Vec<&Row> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Rows(rows) => Some(rows.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// 某张表的行号序列
    pub fn row_numbers(&self, table: &str) -> Vec<u64> {
        self.rows()
            .into_iter()
            .filter(|r| &*r.table_name == table)
            .map(|r| r.row_number)
            .collect()
    }

    /// 表边界调用的简写序列，批次以 `rows:N` 表示
    pub fn outline(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| match e {
                Event::Start(t) => format!("start:{t}"),
                Event::Rows(rows) => format!("rows:{}", rows.len()),
                Event::End => "end".to_string(),
            })
            .collect()
    }
}

impl DumpWriter for RecordingWriter {
    fn name(&self) -> &str {
        "RECORDING"
    }

    fn write_table_start(&mut self, table_name: &str) -> Result<()> {
        self.open = true;
        self.events.push(Event::Start(table_name.to_string()));
        Ok(())
    }

    fn write_rows(&mut self, rows: &[Row]) -> Result<()> {
        assert!(!rows.is_empty(), "writer received an empty batch");
        let table = &rows[0].table_name;
        assert!(rows.iter().all(|r| &r.table_name == table), "mixed-table batch");
        self.events.push(Event::Rows(rows.to_vec()));
        Ok(())
    }

    fn write_table_end(&mut self) -> Result<()> {
        self.open = false;
        self.events.push(Event::End);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.write_table_end()?;
        }
        self.closed = true;
        Ok(())
    }

    fn stats(&self) -> WriteStats {
        WriteStats::default()
    }
}
