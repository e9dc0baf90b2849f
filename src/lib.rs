//! # sqldump-parser
//!
//! 并发解析大型 SQL 转储文件中的 `INSERT INTO ... VALUES (...)` 语句，
//! 按表、按批次把行数据输出为文本、CSV、JSON 或 JSON Lines。
//!
//! ```no_run
//! use sqldump_parser::config::ParserConfig;
//! use sqldump_parser::dump::OutputFormat;
//! use sqldump_parser::pipeline::DumpProcessor;
//! use sqldump_parser::writer::create_writer;
//!
//! # fn main() -> sqldump_parser::error::Result<()> {
//! let mut writer = create_writer(OutputFormat::Jsonl, Box::new(std::io::stdout()))?;
//! let summary = DumpProcessor::new(ParserConfig::default())
//!     .process_file("dump.sql", writer.as_mut())?;
//! writer.close()?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dump;
pub mod error;
pub mod error_writer;
pub mod input_path;
pub mod pipeline;
pub mod writer;

#[cfg(feature = "logging")]
pub mod logging;

pub use error::{Result, SqldumpError};
