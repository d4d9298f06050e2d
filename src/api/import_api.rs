// ==========================================
// 个人财务表格导入 - 导入API
// ==========================================
// 职责: 设置 → 映射 → 表格源 → 仓储 → 驱动，一次调用完成导入
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::import::ImportRunReport;
use crate::importer::{
    ImportDriver, ImportEventPublisher, LogEventPublisher, TableBuilder, TabularSource,
};
use crate::repository::TypedTableRepositoryImpl;
use std::sync::Arc;
use tracing::info;

pub struct ImportApi {
    config: ConfigManager,
    publisher: Arc<dyn ImportEventPublisher>,
    source_override: Option<Arc<dyn TabularSource>>,
}

impl ImportApi {
    /// 默认以日志形式发布进度
    pub fn new(config: ConfigManager) -> Self {
        Self {
            config,
            publisher: Arc::new(LogEventPublisher),
            source_override: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn ImportEventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// 替换按设置创建的表格源
    pub fn with_source(mut self, source: Arc<dyn TabularSource>) -> Self {
        self.source_override = Some(source);
        self
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// 执行一次导入
    ///
    /// # 参数
    /// - sheets: 指定表格（按给定顺序）；为空时导入映射中的全部表格
    ///
    /// # 返回
    /// - Ok(ImportRunReport): 运行报告（成功与否见 is_success）
    /// - Err: 运行前置条件不满足（映射文件 / 工作簿标识 / 数据库）
    pub async fn run_import(&self, sheets: &[String]) -> ApiResult<ImportRunReport> {
        let mapping = self.config.load_table_mapping().await?;
        let workbook_id = self.config.workbook_id()?;

        for sheet in sheets {
            if mapping.get(sheet).is_none() {
                return Err(ApiError::InvalidInput(format!("表格 {} 未定义映射", sheet)));
            }
        }

        let repo = TypedTableRepositoryImpl::new(self.config.db_path())?;
        let source: Box<dyn TabularSource> = match &self.source_override {
            Some(source) => Box::new(source.clone()),
            None => self.config.build_source(),
        };

        let driver = ImportDriver::new(source, TableBuilder::new(repo))
            .with_policy(self.config.failure_policy())
            .with_publisher(self.publisher.clone());

        info!(
            db_path = %self.config.db_path(),
            source = %self.config.source_kind(),
            "导入开始"
        );

        let report = if sheets.is_empty() {
            driver.run(&mapping, &workbook_id).await
        } else {
            driver.run_sheets(&mapping, &workbook_id, sheets).await
        };
        Ok(report)
    }
}
