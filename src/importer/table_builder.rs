// ==========================================
// 个人财务表格导入 - 表构建器
// ==========================================
// 职责: 单张表格 → 类型化目标表
// 流程: 列检查 → 逐列类型转换 → 整表替换
// 红线: 任一步失败都不改动已有目标表
// ==========================================

use crate::domain::dataset::RawDataset;
use crate::domain::import::{ColumnCoercionStats, TableLoadReport};
use crate::domain::schema::TableSchema;
use crate::domain::types::TypedValue;
use crate::importer::coercion::{coerce_column_value, CellOutcome};
use crate::importer::error::{ImportError, ImportResult};
use crate::perf::PerfGuard;
use crate::repository::TypedTableRepository;
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

// ==========================================
// TableBuilder
// ==========================================
pub struct TableBuilder<R>
where
    R: TypedTableRepository,
{
    repo: R,
}

impl<R> TableBuilder<R>
where
    R: TypedTableRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// 目标表建表语句（列按声明顺序）
    pub fn render_create_table(schema: &TableSchema) -> String {
        schema.create_table_sql(&schema.table_name)
    }

    /// 构建目标表
    ///
    /// # 返回
    /// - Ok(TableLoadReport): 目标表已被整表替换
    /// - Err: 列不匹配 / 结构非法 / 写入失败（旧表保持不变）
    #[instrument(skip(self, dataset, schema), fields(table = %schema.table_name))]
    pub async fn build(
        &self,
        dataset: &RawDataset,
        schema: &TableSchema,
    ) -> ImportResult<TableLoadReport> {
        let perf = PerfGuard::new("build_table", schema.table_name.as_str());

        schema
            .validate()
            .map_err(|message| ImportError::InvalidSchema {
                table: schema.table_name.clone(),
                message,
            })?;

        // === 步骤 1: 列检查 ===
        Self::check_columns(dataset, schema)?;

        // === 步骤 2: 类型转换 ===
        let (rows, columns) = Self::coerce_rows(dataset, schema);
        debug!(rows = rows.len(), "类型转换完成");

        for (column, stats) in &columns {
            if stats.has_rejections() {
                warn!(
                    column = %column,
                    rejected = stats.rejected,
                    sample = stats.first_rejected.as_deref().unwrap_or(""),
                    "存在无法解析的值，已按类型缺省值处理"
                );
            }
        }

        // === 步骤 3: 整表替换 ===
        let rows_loaded = self
            .repo
            .replace_table(schema, rows)
            .await
            .map_err(|source| ImportError::Load {
                table: schema.table_name.clone(),
                source,
            })?;

        let report = TableLoadReport {
            table_name: schema.table_name.clone(),
            rows_loaded,
            columns,
            elapsed: perf.elapsed(),
        };
        info!(
            rows = rows_loaded,
            rejected = report.total_rejected(),
            backfilled = report.total_backfilled(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "表已更新"
        );

        Ok(report)
    }

    /// 数据集列与映射必须一一对应
    fn check_columns(dataset: &RawDataset, schema: &TableSchema) -> ImportResult<()> {
        for column in &dataset.columns {
            if schema.spec_for_source(column).is_none() {
                return Err(ImportError::UnmappedColumn {
                    table: schema.table_name.clone(),
                    column: column.clone(),
                });
            }
        }

        let present: HashSet<&str> = dataset.columns.iter().map(String::as_str).collect();
        for source in schema.columns.keys() {
            if !present.contains(source.as_str()) {
                return Err(ImportError::MissingColumn {
                    table: schema.table_name.clone(),
                    column: source.clone(),
                });
            }
        }
        Ok(())
    }

    /// 逐行转换，输出列顺序与 schema 一致
    fn coerce_rows(
        dataset: &RawDataset,
        schema: &TableSchema,
    ) -> (Vec<Vec<TypedValue>>, IndexMap<String, ColumnCoercionStats>) {
        let mut stats: IndexMap<String, ColumnCoercionStats> = schema
            .columns
            .values()
            .map(|spec| (spec.name.clone(), ColumnCoercionStats::default()))
            .collect();

        let mut rows = Vec::with_capacity(dataset.row_count());
        for raw_row in &dataset.rows {
            let mut row = Vec::with_capacity(schema.columns.len());
            for (source, spec) in &schema.columns {
                let cell = coerce_column_value(dataset.cell(raw_row, source), spec);

                if let Some(column_stats) = stats.get_mut(&spec.name) {
                    match &cell.outcome {
                        CellOutcome::Parsed => column_stats.parsed += 1,
                        CellOutcome::Missing => column_stats.missing += 1,
                        CellOutcome::Rejected(err) => {
                            column_stats.rejected += 1;
                            if column_stats.first_rejected.is_none() {
                                column_stats.first_rejected = Some(err.to_string());
                            }
                        }
                    }
                    if cell.backfilled {
                        column_stats.backfilled += 1;
                    }
                }
                row.push(cell.value);
            }
            rows.push(row);
        }

        (rows, stats)
    }
}
