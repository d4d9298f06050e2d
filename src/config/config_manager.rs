// ==========================================
// 个人财务表格导入 - 配置管理器
// ==========================================
// 职责: 持有运行设置，加载映射文件，按设置创建表格源
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::config::settings::{AppSettings, SourceKind};
use crate::config::table_mapping::TableMapping;
use crate::importer::error::ImportResult;
use crate::importer::import_driver::FailurePolicy;
use crate::importer::importer_trait::TabularSource;
use crate::importer::source::{CsvDirectorySource, ExcelWorkbookSource, GoogleSheetsSource};
use async_trait::async_trait;

// ==========================================
// ConfigManager
// ==========================================
#[derive(Debug, Clone)]
pub struct ConfigManager {
    settings: AppSettings,
}

impl ConfigManager {
    pub fn new(settings: AppSettings) -> Self {
        Self { settings }
    }

    /// 从环境变量创建
    pub fn from_env() -> ImportResult<Self> {
        Ok(Self::new(AppSettings::from_env()?))
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// 按设置创建表格源
    pub fn build_source(&self) -> Box<dyn TabularSource> {
        match self.settings.source {
            SourceKind::Csv => Box::new(CsvDirectorySource::new(&self.settings.source_root)),
            SourceKind::Excel => Box::new(ExcelWorkbookSource::new(&self.settings.source_root)),
            SourceKind::Google => {
                Box::new(GoogleSheetsSource::new(self.settings.google_token.clone()))
            }
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn load_table_mapping(&self) -> ImportResult<TableMapping> {
        TableMapping::load_from_path(&self.settings.mapping_path)
    }

    fn workbook_id(&self) -> ImportResult<String> {
        self.settings.require_workbook_id().map(str::to_string)
    }

    fn source_kind(&self) -> SourceKind {
        self.settings.source
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.settings.failure_policy
    }

    fn db_path(&self) -> &str {
        &self.settings.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_source_follows_settings() {
        for (kind, name) in [
            (SourceKind::Csv, "csv"),
            (SourceKind::Excel, "excel"),
            (SourceKind::Google, "google"),
        ] {
            let manager = ConfigManager::new(AppSettings {
                source: kind,
                ..AppSettings::default()
            });
            assert_eq!(manager.build_source().name(), name);
        }
    }

    #[test]
    fn test_workbook_id_required() {
        let manager = ConfigManager::new(AppSettings::default());
        assert!(manager.workbook_id().is_err());
    }
}
