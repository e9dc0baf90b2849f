//! VALUES 子句分词器
//!
//! 单次从左到右扫描，只维护三项状态：是否处于单引号字符串内、
//! 括号嵌套深度、上一个字符是否为未转义的反斜杠。
//!
//! - 引号外的 `(` 深度加一，进入深度 1 时开始一条新记录
//! - 引号外的 `)` 深度减一，回到深度 0 时结束当前记录并提交未完成的字段
//! - 前面不是未转义反斜杠的 `'` 切换引号状态；字符串内连续两个 `'` 表示一个字面引号
//! - 引号外且深度为 1 的 `,` 提交当前字段
//! - 深度大于 0 时其他字符进入字段缓冲
//!
//! 引号本身不进入字段内容，反斜杠转义原样保留。字段两端位于引号外的空白被去掉。
//! 字段是否出现过引号记录在 `Field` 的 `quoted` 中，规范化时不会再次去引号。

use std::ops::Deref;

/// 分词得到的一个字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    /// 去掉引号后的文本
    pub text: String,
    /// 字段中是否出现过引号字符串
    pub quoted: bool,
}

impl Field {
    pub fn unquoted<S: Into<String>>(text: S) -> Self {
        Self { text: text.into(), quoted: false }
    }

    pub fn quoted<S: Into<String>>(text: S) -> Self {
        Self { text: text.into(), quoted: true }
    }
}

impl Deref for Field {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl PartialEq<&str> for Field {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

/// 将 `VALUES` 与结尾 `;` 之间的文本切分为记录，每条记录是字段序列
pub fn tokenize_values(clause: &str) -> Vec<Vec<Field>> {
    let mut tokenizer = ValueTokenizer::with_capacity(estimate_rows(clause));
    tokenizer.feed(clause);
    tokenizer.finish()
}

/// 粗略估计记录数，用于预分配
pub(crate) fn estimate_rows(clause: &str) -> usize {
    clause.matches("),(").count() + 1
}

/// 分词状态机
#[derive(Debug, Default)]
pub struct ValueTokenizer {
    records: Vec<Vec<Field>>,
    record: Vec<Field>,
    field: String,
    quoted: bool,
    /// 字段中最后一个有效字符之后的长度，用于去掉引号外的尾部空白
    keep_len: usize,
    /// 当前字段是否出现过引号或非空白字符
    touched: bool,
    in_quote: bool,
    escaped: bool,
    depth: usize,
}

impl ValueTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(records: usize) -> Self {
        Self { records: Vec::with_capacity(records), ..Self::default() }
    }

    /// 输入一段文本；状态在多次调用之间保留
    pub fn feed(&mut self, text: &str) {
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if self.escaped {
                self.escaped = false;
                self.push_significant(c);
                continue;
            }

            if c == '\\' {
                self.escaped = true;
                self.push_significant(c);
                continue;
            }

            if self.in_quote {
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        self.push_significant('\'');
                    } else {
                        self.in_quote = false;
                    }
                } else {
                    self.push_significant(c);
                }
                continue;
            }

            match c {
                '\'' => {
                    self.in_quote = true;
                    self.quoted = true;
                    self.touched = true;
                }
                '(' => {
                    self.depth += 1;
                    if self.depth == 1 {
                        self.record = Vec::new();
                        self.reset_field();
                    } else {
                        self.push_significant(c);
                    }
                }
                ')' => {
                    if self.depth == 0 {
                        continue;
                    }
                    self.depth -= 1;
                    if self.depth == 0 {
                        if self.touched || !self.record.is_empty() {
                            self.flush_field();
                        }
                        let record = std::mem::take(&mut self.record);
                        self.records.push(record);
                    } else {
                        self.push_significant(c);
                    }
                }
                ',' if self.depth == 1 => self.flush_field(),
                c if c.is_whitespace() => {
                    // 字段开头的空白直接跳过
                    if self.depth > 0 && self.touched {
                        self.field.push(c);
                    }
                }
                c => self.push_significant(c),
            }
        }
    }

    /// 结束输入，返回已完成的记录；未闭合的记录被丢弃
    pub fn finish(self) -> Vec<Vec<Field>> {
        if self.depth > 0 {
            tracing::warn!(
                "VALUES 子句在记录内部结束，丢弃未闭合的记录（深度 {}）",
                self.depth
            );
        }
        self.records
    }

    /// 当前是否位于记录之外（深度为 0 且不在引号内）
    pub fn at_record_boundary(&self) -> bool {
        self.depth == 0 && !self.in_quote && !self.escaped
    }

    fn push_significant(&mut self, c: char) {
        if self.depth == 0 {
            return;
        }
        self.field.push(c);
        self.keep_len = self.field.len();
        self.touched = true;
    }

    fn flush_field(&mut self) {
        self.field.truncate(self.keep_len);
        let text = std::mem::take(&mut self.field);
        self.record.push(Field { text, quoted: self.quoted });
        self.reset_field();
    }

    fn reset_field(&mut self) {
        self.field.clear();
        self.keep_len = 0;
        self.touched = false;
        self.quoted = false;
    }
}
