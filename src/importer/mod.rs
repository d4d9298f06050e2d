// ==========================================
// 个人财务表格导入 - 导入层
// ==========================================
// 职责: 表格源取数 → 类型转换 → 整表替换
// ==========================================

pub mod coercion;
pub mod error;
pub mod events;
pub mod import_driver;
pub mod importer_trait;
pub mod source;
pub mod table_builder;

pub use coercion::{
    apply_nullability_default, coerce_cell, coerce_column_value, type_fallback, CellOutcome,
    CoercedCell, CoercionError,
};
pub use error::{ImportError, ImportResult};
pub use events::{
    ImportEvent, ImportEventPublisher, LogEventPublisher, NoOpEventPublisher,
    RecordingEventPublisher,
};
pub use import_driver::{FailurePolicy, ImportDriver};
pub use importer_trait::TabularSource;
pub use source::{CsvDirectorySource, ExcelWorkbookSource, GoogleSheetsSource};
pub use table_builder::TableBuilder;
