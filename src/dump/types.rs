//! 转储数据的核心类型定义

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::dump::tokenizer::Field;
use crate::error::SqldumpError;

/// 规范化后的字段值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL `NULL`
    Null,
    /// 空字符串（`''` 或空字段）
    Empty,
    /// 未加引号的字面量（数字等），原样保留
    Literal(String),
    /// 去掉外层引号后的字符串内容
    Quoted(String),
}

impl Value {
    /// 字符串视图，`Null` 返回 None
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Null => None,
            Value::Empty => Some(""),
            Value::Literal(s) | Value::Quoted(s) => Some(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => f.write_str("NULL"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

/// 一行数据：列名到值的有序映射
///
/// 列名由同一条语句的所有行共享。值的数量少于列数时，
/// 缺失的列不出现在映射中；多出的值被丢弃。
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl RowData {
    pub fn new(columns: Arc<[String]>, mut values: Vec<Value>) -> Self {
        values.truncate(columns.len());
        Self { columns, values }
    }

    /// 按列名查找
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .find(|(name, _)| name.as_str() == column)
            .map(|(_, value)| value)
    }

    /// 按列顺序遍历存在的键值对
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    /// 实际存在的列名
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().take(self.values.len()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 取出值容器，供对象池回收
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Serialize for RowData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// 输出行
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Row {
    /// 所属表名
    pub table_name: Arc<str>,
    /// 表内行号，从 1 开始，由聚合器分配；分配前为 0
    pub row_number: u64,
    /// 行数据
    pub data: RowData,
}

impl Row {
    /// 创建尚未编号的行
    pub fn unnumbered(table_name: Arc<str>, data: RowData) -> Self {
        Self { table_name, row_number: 0, data }
    }
}

/// 解析后的单条 INSERT 语句（中间结果）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    /// 表名
    pub table_name: String,
    /// 列名列表
    pub columns: Vec<String>,
    /// 未规范化的字段序列
    pub rows: Vec<Vec<Field>>,
}

/// 表发现阶段得到的表信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// 表名
    pub name: String,
    /// 首次出现的行号
    pub line_from: usize,
    /// 最后一次出现的行号
    pub line_to: usize,
    /// INSERT 语句数量
    pub statements: usize,
}

/// 输出格式
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, Deserialize,
)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "txt", alias = "text")]
    Text,
    #[serde(rename = "csv")]
    Csv,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "jsonl")]
    Jsonl,
}

impl OutputFormat {
    /// 文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = SqldumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            other => Err(SqldumpError::UnsupportedFormat(other.to_string())),
        }
    }
}
