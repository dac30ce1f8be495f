//! `COPY ... FROM STDIN (FORMAT csv)` 的行编码
//!
//! 规则：
//! - 文本一律加双引号，内部双引号翻倍，因此空串写作 `""`
//! - 未加引号的空字段表示 NULL
//! - bytea 写作 `\x` + 十六进制
//! - JSON 以文本形式写入

use bigdecimal::BigDecimal;

/// CSV 中的一个字段。
#[derive(Debug, Clone, Copy)]
pub enum CsvField<'a> {
    Null,
    Text(&'a str),
    Int(i64),
    Numeric(&'a BigDecimal),
    Bytes(&'a [u8]),
    Json(&'a serde_json::Value),
}

/// 把多行字段编码为 COPY 的输入缓冲。
#[derive(Debug, Default)]
pub struct CsvEncoder {
    buffer: String,
    rows: usize,
}

impl CsvEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, fields: &[CsvField<'_>]) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.buffer.push(',');
            }
            self.push_field(field);
        }
        self.buffer.push('\n');
        self.rows += 1;
    }

    fn push_field(&mut self, field: &CsvField<'_>) {
        match field {
            CsvField::Null => {}
            CsvField::Text(text) => self.push_quoted(text),
            CsvField::Int(value) => self.buffer.push_str(&value.to_string()),
            CsvField::Numeric(value) => self.buffer.push_str(&value.to_string()),
            CsvField::Bytes(bytes) => {
                self.buffer.push_str("\\x");
                self.buffer.push_str(&hex::encode(bytes));
            }
            CsvField::Json(value) => self.push_quoted(&value.to_string()),
        }
    }

    fn push_quoted(&mut self, text: &str) {
        self.buffer.push('"');
        self.buffer.push_str(&text.replace('"', "\"\""));
        self.buffer.push('"');
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.into_bytes()
    }
}

/// `COPY table(cols) FROM STDIN (FORMAT csv)`
pub fn copy_statement(table: &str, columns: &[&str]) -> String {
    format!(
        "COPY {table}({}) FROM STDIN (FORMAT csv)",
        columns.join(", ")
    )
}
