//! 语句扫描器
//!
//! 逐行读取转储文件，把以分号结尾的多行语句重新拼接成一条，
//! 并为每条语句分配递增的提交序号。

use crate::error::{Result, SqldumpError};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// 读缓冲区大小
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// 扫描得到的一条完整语句
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedStatement {
    /// 提交序号，从 0 开始连续递增
    pub sequence: u64,
    /// 语句起始行号（1 开始）
    pub line: usize,
    /// 语句文本，多行以 `\n` 连接
    pub text: String,
}

/// 按行扫描语句的迭代器
///
/// 遇到读错误或超长行时产出一个 `Err` 并停止。
pub struct StatementScanner<R> {
    reader: R,
    max_line_bytes: usize,
    line_no: usize,
    buffer: Vec<u8>,
    current: String,
    current_line: usize,
    sequence: u64,
    finished: bool,
}

impl StatementScanner<BufReader<File>> {
    /// 打开转储文件
    pub fn open<P: AsRef<Path>>(path: P, max_line_bytes: usize) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(
            BufReader::with_capacity(READ_BUFFER_SIZE, file),
            max_line_bytes,
        ))
    }
}

impl<R: BufRead> StatementScanner<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            max_line_bytes,
            line_no: 0,
            buffer: Vec::new(),
            current: String::new(),
            current_line: 0,
            sequence: 0,
            finished: false,
        }
    }

    /// 已读取的行数
    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    /// 读取下一行（不含换行符），文件结束返回 None
    fn read_line(&mut self) -> Result<Option<String>> {
        self.buffer.clear();
        // 多读两个字节，恰好 max 字节的内容加 `\r\n` 不算超长
        let limit = self.max_line_bytes as u64 + 2;
        let n = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buffer)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        if self.buffer.last() == Some(&b'\n') {
            self.buffer.pop();
            if self.buffer.last() == Some(&b'\r') {
                self.buffer.pop();
            }
        }
        if self.buffer.len() > self.max_line_bytes {
            return Err(SqldumpError::LineTooLong {
                line: self.line_no,
                limit: self.max_line_bytes,
            });
        }

        let line = match std::str::from_utf8(&self.buffer) {
            Ok(line) => line.to_owned(),
            Err(_) => {
                tracing::warn!("第{}行包含非 UTF-8 字节，按有损方式解码", self.line_no);
                String::from_utf8_lossy(&self.buffer).into_owned()
            }
        };
        Ok(Some(line))
    }

    fn emit(&mut self) -> ScannedStatement {
        let statement = ScannedStatement {
            sequence: self.sequence,
            line: self.current_line,
            text: std::mem::take(&mut self.current),
        };
        self.sequence += 1;
        statement
    }

    fn next_statement(&mut self) -> Result<Option<ScannedStatement>> {
        loop {
            let Some(line) = self.read_line()? else {
                if self.current.trim().is_empty() {
                    return Ok(None);
                }
                tracing::warn!(
                    "文件在第{}行开始的语句结束前到达末尾，仍提交该语句",
                    self.current_line
                );
                return Ok(Some(self.emit()));
            };

            let trimmed = line.trim();
            if self.current.is_empty() {
                // 语句之间的空行与注释
                if trimmed.is_empty() || trimmed.starts_with("--") {
                    continue;
                }
                self.current_line = self.line_no;
            } else {
                self.current.push('\n');
            }

            let complete = trimmed.ends_with(';');
            self.current.push_str(&line);
            if complete {
                return Ok(Some(self.emit()));
            }
        }
    }
}

impl<R: BufRead> Iterator for StatementScanner<R> {
    type Item = Result<ScannedStatement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_statement() {
            Ok(Some(statement)) => Some(Ok(statement)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(input: &str, max: usize) -> Vec<Result<ScannedStatement>> {
        StatementScanner::new(Cursor::new(input.as_bytes().to_vec()), max).collect()
    }

    #[test]
    fn test_multi_line_statement_reassembled() {
        let input = "-- header\n\nINSERT INTO t (a)\nVALUES (1),\n(2);\nSELECT 1;\n";
        let out: Vec<_> = scan(input, 1024).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].sequence, 0);
        assert_eq!(out[0].line, 3);
        assert_eq!(out[0].text, "INSERT INTO t (a)\nVALUES (1),\n(2);");
        assert_eq!(out[1].sequence, 1);
        assert_eq!(out[1].line, 6);
    }

    #[test]
    fn test_crlf_and_trailing_statement() {
        let input = "INSERT INTO t (a) VALUES (1);\r\nINSERT INTO t (a) VALUES (2)";
        let out: Vec<_> = scan(input, 1024).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "INSERT INTO t (a) VALUES (1);");
        assert_eq!(out[1].text, "INSERT INTO t (a) VALUES (2)");
    }

    #[test]
    fn test_blank_lines_inside_statement_are_kept() {
        let input = "INSERT INTO t (a) VALUES ('x\n\ny');\n";
        let out: Vec<_> = scan(input, 1024).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(out[0].text, "INSERT INTO t (a) VALUES ('x\n\ny');");
    }

    #[test]
    fn test_line_too_long_is_fatal() {
        let input = format!("SELECT 1;\n{}\nSELECT 2;\n", "x".repeat(64));
        let out = scan(&input, 16);
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        match &out[1] {
            Err(SqldumpError::LineTooLong { line, limit }) => {
                assert_eq!(*line, 2);
                assert_eq!(*limit, 16);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_line_exactly_at_limit_is_ok() {
        let input = "0123456789ABCDE;\n";
        let out = scan(input, 16);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_ok());
    }

    #[test]
    fn test_crlf_line_exactly_at_limit_is_ok() {
        let out = scan("0123456789ABCDE;\r\nSELECT 1;\r\n", 16);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().text, "0123456789ABCDE;");

        let out = scan("0123456789ABCDEF;\r\n", 16);
        assert!(matches!(out[0], Err(SqldumpError::LineTooLong { line: 1, .. })));
    }

    #[test]
    fn test_invalid_utf8_decoded_lossily() {
        let mut bytes = b"INSERT INTO t (a) VALUES ('".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"');\n");
        let out: Vec<_> = StatementScanner::new(Cursor::new(bytes), 1024)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(out.len(), 1);
        assert!(out[0].text.contains('\u{fffd}'));
    }
}
