// ==========================================
// 个人财务表格导入 - 运行设置
// ==========================================
// 来源: 环境变量（命令行参数可覆盖）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_driver::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub mod env_keys {
    pub const DB_PATH: &str = "FINANCE_DB_PATH";
    pub const MAPPING_PATH: &str = "TABLE_MAPPING_PATH";
    pub const SPREADSHEET_ID: &str = "SPREADSHEET_ID";
    pub const SOURCE: &str = "FINANCE_SOURCE";
    pub const SOURCE_ROOT: &str = "FINANCE_SOURCE_ROOT";
    pub const GOOGLE_TOKEN: &str = "GOOGLE_SHEETS_TOKEN";
    pub const FAILURE_POLICY: &str = "FINANCE_FAILURE_POLICY";
}

pub const DEFAULT_DB_PATH: &str = "finance.db";
pub const DEFAULT_MAPPING_PATH: &str = "table_mapping.json";
pub const DEFAULT_SOURCE_ROOT: &str = "data";

// ==========================================
// SourceKind - 表格源类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Csv,
    Excel,
    Google,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Csv => "csv",
            SourceKind::Excel => "excel",
            SourceKind::Google => "google",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(SourceKind::Csv),
            "excel" | "xlsx" => Ok(SourceKind::Excel),
            "google" | "sheets" => Ok(SourceKind::Google),
            other => Err(format!("未知的表格源: {}", other)),
        }
    }
}

// ==========================================
// AppSettings
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub db_path: String,
    pub mapping_path: PathBuf,
    /// 工作簿标识；CSV 源为子目录名，Excel 源为文件名（不含扩展名）
    pub workbook_id: Option<String>,
    pub source: SourceKind,
    pub source_root: PathBuf,
    #[serde(skip_serializing)]
    pub google_token: Option<String>,
    pub failure_policy: FailurePolicy,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            mapping_path: PathBuf::from(DEFAULT_MAPPING_PATH),
            workbook_id: None,
            source: SourceKind::default(),
            source_root: PathBuf::from(DEFAULT_SOURCE_ROOT),
            google_token: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AppSettings {
    /// 从进程环境读取
    pub fn from_env() -> ImportResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取（空字符串视为未设置）
    pub fn from_lookup<F>(lookup: F) -> ImportResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(v) = get(env_keys::DB_PATH) {
            settings.db_path = v;
        }
        if let Some(v) = get(env_keys::MAPPING_PATH) {
            settings.mapping_path = PathBuf::from(v);
        }
        settings.workbook_id = get(env_keys::SPREADSHEET_ID);
        if let Some(v) = get(env_keys::SOURCE) {
            settings.source = v.parse().map_err(ImportError::Config)?;
        }
        if let Some(v) = get(env_keys::SOURCE_ROOT) {
            settings.source_root = PathBuf::from(v);
        }
        settings.google_token = get(env_keys::GOOGLE_TOKEN);
        if let Some(v) = get(env_keys::FAILURE_POLICY) {
            settings.failure_policy = v.parse().map_err(ImportError::Config)?;
        }

        Ok(settings)
    }

    /// 工作簿标识（导入必需）
    pub fn require_workbook_id(&self) -> ImportResult<&str> {
        self.workbook_id.as_deref().ok_or_else(|| {
            ImportError::Config(format!("未设置工作簿标识 ({})", env_keys::SPREADSHEET_ID))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = AppSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.db_path, "finance.db");
        assert_eq!(settings.mapping_path, PathBuf::from("table_mapping.json"));
        assert_eq!(settings.source, SourceKind::Csv);
        assert_eq!(settings.failure_policy, FailurePolicy::FailFast);
        assert!(settings.require_workbook_id().is_err());
    }

    #[test]
    fn test_overrides() {
        let settings = AppSettings::from_lookup(lookup(&[
            ("FINANCE_DB_PATH", "/tmp/f.db"),
            ("SPREADSHEET_ID", "abc"),
            ("FINANCE_SOURCE", "Excel"),
            ("FINANCE_FAILURE_POLICY", "continue_on_error"),
            ("GOOGLE_SHEETS_TOKEN", "  "),
        ]))
        .unwrap();
        assert_eq!(settings.db_path, "/tmp/f.db");
        assert_eq!(settings.require_workbook_id().unwrap(), "abc");
        assert_eq!(settings.source, SourceKind::Excel);
        assert_eq!(settings.failure_policy, FailurePolicy::ContinueOnError);
        assert!(settings.google_token.is_none());
    }

    #[test]
    fn test_invalid_source() {
        let err = AppSettings::from_lookup(lookup(&[("FINANCE_SOURCE", "ftp")])).unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }
}
