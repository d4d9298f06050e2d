// ==========================================
// 个人财务表格导入 - 表结构描述 (Schema Descriptor)
// ==========================================
// 职责: 源列 → 目标列的重命名 / 类型 / 可空性
// 红线: 列顺序 = 配置文件中的声明顺序
// ==========================================

use crate::domain::types::ColumnType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 导入暂存表后缀: <table>__staging
pub const STAGING_SUFFIX: &str = "__staging";

// ==========================================
// ColumnSpec - 单列规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// 目标列名
    pub name: String,
    /// 目标列类型
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// 是否允许 NULL
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: &str, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable,
        }
    }

    /// 列定义片段: "name TYPE NULL|NOT NULL"
    pub fn column_definition(&self) -> String {
        format!(
            "{} {} {}",
            quote_identifier(&self.name),
            self.column_type.sql_type(),
            if self.nullable { "NULL" } else { "NOT NULL" }
        )
    }
}

// ==========================================
// TableSchema - 单表描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// 目标表名
    pub table_name: String,
    /// 源列名 → 列规则（有序）
    pub columns: IndexMap<String, ColumnSpec>,
}

impl TableSchema {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: IndexMap::new(),
        }
    }

    /// 追加一列（构造器风格，测试常用）
    pub fn with_column(mut self, source: &str, spec: ColumnSpec) -> Self {
        self.columns.insert(source.to_string(), spec);
        self
    }

    /// 目标列名（声明顺序）
    pub fn destination_names(&self) -> Vec<&str> {
        self.columns.values().map(|c| c.name.as_str()).collect()
    }

    pub fn spec_for_source(&self, source: &str) -> Option<&ColumnSpec> {
        self.columns.get(source)
    }

    /// 建表语句（表名可与 table_name 不同，用于暂存表）
    pub fn create_table_sql(&self, table_name: &str) -> String {
        let columns: Vec<String> = self
            .columns
            .values()
            .map(ColumnSpec::column_definition)
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(table_name),
            columns.join(", ")
        )
    }

    /// 检查本表描述是否自洽
    ///
    /// # 规则
    /// - 至少一列
    /// - 表名 / 目标列名为合法标识符
    /// - 表名不得以暂存表后缀结尾（会与其他表的暂存表冲突）
    /// - 目标列名在表内唯一（大小写不敏感，SQLite 列名不区分大小写）
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_identifier(&self.table_name) {
            return Err(format!("非法表名: {}", self.table_name));
        }
        if self.table_name.to_ascii_lowercase().ends_with(STAGING_SUFFIX) {
            return Err(format!("表名不得以 {} 结尾: {}", STAGING_SUFFIX, self.table_name));
        }
        if self.columns.is_empty() {
            return Err(format!("表 {} 未声明任何列", self.table_name));
        }

        let mut seen = HashSet::new();
        for (source, spec) in &self.columns {
            if !is_valid_identifier(&spec.name) {
                return Err(format!(
                    "表 {} 源列 {} 的目标列名非法: {}",
                    self.table_name, source, spec.name
                ));
            }
            if !seen.insert(spec.name.to_lowercase()) {
                return Err(format!(
                    "表 {} 目标列名重复: {}",
                    self.table_name, spec.name
                ));
            }
        }
        Ok(())
    }
}

/// 合法标识符: [A-Za-z_][A-Za-z0-9_]*
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// 标识符加双引号（已校验的标识符不含引号，此处仍做转义）
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
