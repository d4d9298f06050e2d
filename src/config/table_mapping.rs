// ==========================================
// 个人财务表格导入 - 表格映射配置
// ==========================================
// 格式: { "表格名": { "table_name": "...", "columns": { "源列": {name, type, nullable} } } }
// 红线: 表格顺序 = 文件中的声明顺序 = 导入顺序
// ==========================================

use crate::domain::schema::TableSchema;
use crate::importer::error::{ImportError, ImportResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// 表格名 → 目标表描述
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMapping {
    sheets: IndexMap<String, TableSchema>,
}

impl TableMapping {
    /// 从 JSON 文件加载并校验
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ImportError::Config(format!("无法读取映射文件 {}: {}", path.display(), e))
        })?;
        let mapping = Self::from_json_str(&content)?;
        debug!(path = %path.display(), sheets = mapping.len(), "映射文件已加载");
        Ok(mapping)
    }

    pub fn from_json_str(content: &str) -> ImportResult<Self> {
        let mapping: TableMapping = serde_json::from_str(content)?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// 校验: 各表自洽，且表名跨表格唯一（大小写不敏感）
    pub fn validate(&self) -> ImportResult<()> {
        let mut table_names = HashSet::new();
        for (sheet, schema) in &self.sheets {
            schema.validate().map_err(|message| {
                ImportError::Config(format!("表格 {}: {}", sheet, message))
            })?;
            if !table_names.insert(schema.table_name.to_lowercase()) {
                return Err(ImportError::Config(format!(
                    "表格 {}: 目标表名重复 {}",
                    sheet, schema.table_name
                )));
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, sheet: &str, schema: TableSchema) {
        self.sheets.insert(sheet.to_string(), schema);
    }

    pub fn get(&self, sheet: &str) -> Option<&TableSchema> {
        self.sheets.get(sheet)
    }

    /// 表格名（声明顺序）
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}
