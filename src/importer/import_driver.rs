// ==========================================
// 个人财务表格导入 - 导入驱动
// ==========================================
// 职责: 按配置顺序逐表取数、建表，汇总运行报告
// 流程: 取数 → 查映射 → 建表 → 进度事件
// 红线: 错误不越过驱动边界，全部落入 ImportRunReport
// ==========================================

use crate::config::table_mapping::TableMapping;
use crate::domain::import::{ImportRunReport, TableLoadReport, TableOutcome};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::events::{ImportEvent, ImportEventPublisher, NoOpEventPublisher};
use crate::importer::importer_trait::TabularSource;
use crate::importer::table_builder::TableBuilder;
use crate::perf::PerfGuard;
use crate::repository::TypedTableRepository;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// FailurePolicy - 失败处理策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 首个失败即终止，其余表记为 Skipped 且不取数
    #[default]
    FailFast,
    /// 记录失败并继续处理其余表
    ContinueOnError,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailFast => write!(f, "fail_fast"),
            FailurePolicy::ContinueOnError => write!(f, "continue_on_error"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_fast" | "abort" => Ok(FailurePolicy::FailFast),
            "continue_on_error" | "continue" => Ok(FailurePolicy::ContinueOnError),
            other => Err(format!("未知的失败策略: {}", other)),
        }
    }
}

// ==========================================
// ImportDriver
// ==========================================
pub struct ImportDriver<R>
where
    R: TypedTableRepository,
{
    source: Box<dyn TabularSource>,
    builder: TableBuilder<R>,
    publisher: Arc<dyn ImportEventPublisher>,
    policy: FailurePolicy,
}

impl<R> ImportDriver<R>
where
    R: TypedTableRepository,
{
    /// 默认策略 FailFast，不发布事件
    pub fn new(source: Box<dyn TabularSource>, builder: TableBuilder<R>) -> Self {
        Self {
            source,
            builder,
            publisher: Arc::new(NoOpEventPublisher),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn ImportEventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn builder(&self) -> &TableBuilder<R> {
        &self.builder
    }

    /// 按配置顺序导入全部表格
    pub async fn run(&self, mapping: &TableMapping, workbook_id: &str) -> ImportRunReport {
        let sheets = mapping.sheet_names();
        self.run_sheets(mapping, workbook_id, &sheets).await
    }

    /// 按给定顺序导入指定表格
    #[instrument(skip(self, mapping, sheets), fields(run_id, policy = %self.policy))]
    pub async fn run_sheets(
        &self,
        mapping: &TableMapping,
        workbook_id: &str,
        sheets: &[String],
    ) -> ImportRunReport {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let started_at = Utc::now();
        let total = sheets.len();
        info!(
            workbook_id = %workbook_id,
            total,
            source = self.source.name(),
            "开始导入"
        );

        let mut outcomes = Vec::with_capacity(total);
        let mut aborted = false;

        for (i, sheet) in sheets.iter().enumerate() {
            if aborted {
                outcomes.push(TableOutcome::Skipped {
                    sheet: sheet.clone(),
                });
                continue;
            }

            let index = i + 1;
            self.emit(ImportEvent::TableStarted {
                index,
                total,
                sheet: sheet.clone(),
            });

            match self.import_sheet(mapping, workbook_id, sheet).await {
                Ok(report) => {
                    self.emit(ImportEvent::TableSucceeded {
                        index,
                        total,
                        sheet: sheet.clone(),
                        rows: report.rows_loaded,
                    });
                    outcomes.push(TableOutcome::Succeeded {
                        sheet: sheet.clone(),
                        report,
                    });
                }
                Err(err) => {
                    let reason = err.to_string();
                    error!(sheet = %sheet, error = %reason, "表格导入失败");
                    self.emit(ImportEvent::TableFailed {
                        index,
                        total,
                        sheet: sheet.clone(),
                        reason: reason.clone(),
                    });
                    outcomes.push(TableOutcome::Failed {
                        sheet: sheet.clone(),
                        table_name: mapping.get(sheet).map(|s| s.table_name.clone()),
                        reason,
                    });

                    if self.policy == FailurePolicy::FailFast {
                        aborted = true;
                    }
                }
            }
        }

        let report = ImportRunReport {
            run_id: run_id.clone(),
            workbook_id: workbook_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        self.emit(ImportEvent::RunFinished {
            run_id,
            succeeded: report.succeeded_count(),
            total,
        });
        info!(
            success = report.is_success(),
            succeeded = report.succeeded_count(),
            total,
            "导入结束"
        );

        report
    }

    /// 单表: 取数 → 查映射 → 建表
    async fn import_sheet(
        &self,
        mapping: &TableMapping,
        workbook_id: &str,
        sheet: &str,
    ) -> ImportResult<TableLoadReport> {
        let _perf = PerfGuard::new("import_sheet", sheet);

        // === 步骤 1: 取数 ===
        let dataset = self
            .source
            .fetch(workbook_id, sheet)
            .await
            .map_err(|e| e.into_fetch_failure(sheet))?
            .ok_or_else(|| ImportError::NoData(sheet.to_string()))?;

        // === 步骤 2: 查映射 ===
        let schema = mapping
            .get(sheet)
            .ok_or_else(|| ImportError::SheetNotMapped(sheet.to_string()))?;

        // === 步骤 3: 建表 ===
        self.builder.build(&dataset, schema).await
    }

    fn emit(&self, event: ImportEvent) {
        if let Err(e) = self.publisher.publish(&event) {
            warn!(event = event.kind(), error = %e, "进度事件发布失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{RawCell, RawDataset};
    use crate::domain::schema::{ColumnSpec, TableSchema};
    use crate::domain::types::ColumnType;
    use crate::importer::events::RecordingEventPublisher;
    use crate::repository::TypedTableRepositoryImpl;
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 内存表格源，记录取数顺序
    struct MemorySource {
        sheets: HashMap<String, RawDataset>,
        fetched: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TabularSource for MemorySource {
        async fn fetch(&self, _workbook_id: &str, sheet: &str) -> ImportResult<Option<RawDataset>> {
            self.fetched.lock().unwrap().push(sheet.to_string());
            Ok(self.sheets.get(sheet).cloned())
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    fn schema(table: &str) -> TableSchema {
        TableSchema::new(table)
            .with_column("Nome", ColumnSpec::new("nome", ColumnType::Text, false))
            .with_column("Valor", ColumnSpec::new("valor", ColumnType::Decimal, false))
    }

    fn data(columns: &[&str]) -> RawDataset {
        RawDataset::from_records(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![columns.iter().map(|_| RawCell::Text("1".to_string())).collect()],
        )
    }

    fn mapping() -> TableMapping {
        let mut mapping = TableMapping::default();
        mapping.insert("Contas", schema("tb_contas"));
        mapping.insert("Despesas", schema("tb_despesas"));
        mapping.insert("Metas", schema("tb_metas"));
        mapping
    }

    fn driver(
        sheets: Vec<(&str, RawDataset)>,
    ) -> (ImportDriver<TypedTableRepositoryImpl>, Arc<Mutex<Vec<String>>>) {
        let fetched = Arc::new(Mutex::new(Vec::new()));
        let source = MemorySource {
            sheets: sheets
                .into_iter()
                .map(|(name, data)| (name.to_string(), data))
                .collect(),
            fetched: fetched.clone(),
        };
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let builder = TableBuilder::new(TypedTableRepositoryImpl::from_connection(conn));
        (ImportDriver::new(Box::new(source), builder), fetched)
    }

    #[tokio::test]
    async fn test_run_all_tables_in_order() {
        let (driver, fetched) = driver(vec![
            ("Contas", data(&["Nome", "Valor"])),
            ("Despesas", data(&["Nome", "Valor"])),
            ("Metas", data(&["Nome", "Valor"])),
        ]);

        let report = driver.run(&mapping(), "wb").await;
        assert!(report.is_success());
        assert_eq!(report.succeeded_count(), 3);
        assert_eq!(*fetched.lock().unwrap(), vec!["Contas", "Despesas", "Metas"]);
    }

    #[tokio::test]
    async fn test_fail_fast_never_fetches_remaining_tables() {
        let (driver, fetched) = driver(vec![
            ("Contas", data(&["Nome", "Valor"])),
            ("Despesas", data(&["Nome", "Valor", "Extra"])),
            ("Metas", data(&["Nome", "Valor"])),
        ]);
        let publisher = Arc::new(RecordingEventPublisher::new());
        let driver = driver.with_publisher(publisher.clone());

        let report = driver.run(&mapping(), "wb").await;
        assert!(!report.is_success());
        assert_eq!(*fetched.lock().unwrap(), vec!["Contas", "Despesas"]);
        assert!(matches!(
            report.outcome_for("Despesas"),
            Some(TableOutcome::Failed { table_name: Some(t), .. }) if t == "tb_despesas"
        ));
        assert!(matches!(
            report.outcome_for("Metas"),
            Some(TableOutcome::Skipped { .. })
        ));

        let kinds: Vec<&str> = publisher.events().iter().map(ImportEvent::kind).collect();
        assert_eq!(
            kinds,
            vec!["TableStarted", "TableSucceeded", "TableStarted", "TableFailed", "RunFinished"]
        );
    }

    #[tokio::test]
    async fn test_continue_on_error_processes_remaining_tables() {
        let (driver, fetched) = driver(vec![
            ("Contas", data(&["Nome", "Valor"])),
            ("Metas", data(&["Nome", "Valor"])),
        ]);
        let driver = driver.with_policy(FailurePolicy::ContinueOnError);

        let report = driver.run(&mapping(), "wb").await;
        assert!(!report.is_success());
        assert_eq!(report.succeeded_count(), 2);
        assert_eq!(fetched.lock().unwrap().len(), 3);
        match report.outcome_for("Despesas") {
            Some(TableOutcome::Failed { reason, .. }) => assert!(reason.contains("Despesas")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unmapped_sheet_is_config_failure() {
        let (driver, _fetched) = driver(vec![("Investimentos", data(&["Nome", "Valor"]))]);

        let report = driver
            .run_sheets(&mapping(), "wb", &["Investimentos".to_string()])
            .await;
        match report.outcome_for("Investimentos") {
            Some(TableOutcome::Failed { table_name, reason, .. }) => {
                assert!(table_name.is_none());
                assert!(reason.contains("Investimentos"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("continue-on-error".parse::<FailurePolicy>().unwrap(), FailurePolicy::ContinueOnError);
        assert_eq!("FAIL_FAST".parse::<FailurePolicy>().unwrap(), FailurePolicy::FailFast);
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
