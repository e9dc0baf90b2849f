//! SQL 转储解析模块
//!
//! 提供 INSERT 语句的扫描、分词、规范化和类型定义

pub mod chunk;
pub mod discovery;
pub mod normalizer;
pub mod pool;
pub mod scanner;
pub mod statement;
pub mod tokenizer;
pub mod types;

// 重新导出核心类型和函数
pub use discovery::scan_tables;
pub use normalizer::{normalize_field, normalize_token};
pub use scanner::{ScannedStatement, StatementScanner};
pub use statement::{ParseOptions, StatementOutcome, parse_statement};
pub use tokenizer::{Field, tokenize_values};
pub use types::{OutputFormat, ParsedStatement, Row, RowData, TableInfo, Value};
