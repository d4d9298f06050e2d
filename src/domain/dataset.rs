// ==========================================
// 个人财务表格导入 - 原始数据集模型
// ==========================================
// 职责: 外部表格源取回的未类型化数据（取回后不可变）
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// RawCell - 未类型化单元格
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RawCell {
    /// 从文本单元格构造：空白 → Empty
    pub fn from_text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }
}

/// 一行原始数据：源列名 → 单元格
pub type RawRow = HashMap<String, RawCell>;

// ==========================================
// RawDataset - 原始数据集
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    /// 表头（源列名，按出现顺序）
    pub columns: Vec<String>,
    /// 数据行
    pub rows: Vec<RawRow>,
}

impl RawDataset {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }

    /// 由表头 + 按列顺序排列的行构造（测试与解析器共用）
    pub fn from_records(columns: Vec<String>, records: Vec<Vec<RawCell>>) -> Self {
        let rows = records
            .into_iter()
            .map(|cells| {
                columns
                    .iter()
                    .cloned()
                    .zip(cells)
                    .collect::<RawRow>()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 取单元格；行中缺失该列时视为 Empty
    pub fn cell<'a>(&'a self, row: &'a RawRow, column: &str) -> &'a RawCell {
        const EMPTY: &RawCell = &RawCell::Empty;
        row.get(column).unwrap_or(EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_blank_is_empty() {
        assert_eq!(RawCell::from_text("   "), RawCell::Empty);
        assert_eq!(RawCell::from_text(" abc "), RawCell::Text("abc".to_string()));
    }

    #[test]
    fn test_missing_cell_reads_as_empty() {
        let dataset = RawDataset::from_records(
            vec!["Nome".to_string(), "Valor".to_string()],
            vec![vec![RawCell::Text("Mercado".to_string())]],
        );
        let row = &dataset.rows[0];
        assert_eq!(dataset.cell(row, "Nome"), &RawCell::Text("Mercado".to_string()));
        assert_eq!(dataset.cell(row, "Valor"), &RawCell::Empty);
    }
}
