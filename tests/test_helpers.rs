// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、CSV 工作簿、映射文件、计数表格源
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use finance_sheets_import::config::{AppSettings, SourceKind};
use finance_sheets_import::domain::RawDataset;
use finance_sheets_import::importer::{CsvDirectorySource, ImportResult, TabularSource};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

pub const WORKBOOK_ID: &str = "financas";

/// 三张表: Contas → Despesas → Metas（导入顺序）
pub const SAMPLE_MAPPING: &str = r#"{
    "Contas": {
        "table_name": "tb_contas",
        "columns": {
            "Nome": {"name": "nome", "type": "TEXT", "nullable": false},
            "Saldo Inicial": {"name": "saldo_inicial", "type": "DECIMAL", "nullable": false},
            "Ativo": {"name": "ativo", "type": "BOOLEAN", "nullable": true}
        }
    },
    "Despesas": {
        "table_name": "tb_despesas",
        "columns": {
            "Descrição": {"name": "descricao", "type": "TEXT", "nullable": false},
            "Valor": {"name": "valor", "type": "DECIMAL", "nullable": false},
            "Data": {"name": "data", "type": "DATE", "nullable": true},
            "Realizado": {"name": "realizado", "type": "BOOLEAN", "nullable": true}
        }
    },
    "Metas": {
        "table_name": "tb_metas",
        "columns": {
            "Meta": {"name": "meta", "type": "TEXT", "nullable": false},
            "Alvo": {"name": "alvo", "type": "DECIMAL", "nullable": true},
            "Prazo": {"name": "prazo", "type": "INTEGER", "nullable": false}
        }
    }
}"#;

pub const CONTAS_CSV: &str = "Nome,Saldo Inicial,Ativo\n\
Nubank,\"R$ 2.500,00\",TRUE\n\
Carteira,abc,1\n";

pub const DESPESAS_CSV: &str = "Descrição,Valor,Data,Realizado\n\
Mercado,\"R$ 1.234,56\",15/01/2024,TRUE\n\
Aluguel,,2024-02-01,false\n\
Cinema,\"R$ 45,90\",,\n";

pub const METAS_CSV: &str = "Meta,Alvo,Prazo\n\
Viagem,\"R$ 10.000,00\",12\n\
Reserva,,6.7\n";

/// 测试用 Excel 工作簿所在目录（financas.xlsx）
pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("datasets")
}

/// 创建临时测试数据库
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> (NamedTempFile, String) {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();
    (temp_file, db_path)
}

/// 临时 CSV 工作簿目录 + 映射文件
pub struct TestWorkspace {
    pub dir: TempDir,
    pub db_file: NamedTempFile,
    pub db_path: String,
}

impl TestWorkspace {
    /// 写入示例映射与三张示例表格
    pub fn with_sample_data() -> Self {
        let workspace = Self::empty();
        workspace.write_mapping(SAMPLE_MAPPING);
        workspace.write_sheet("Contas", CONTAS_CSV);
        workspace.write_sheet("Despesas", DESPESAS_CSV);
        workspace.write_sheet("Metas", METAS_CSV);
        workspace
    }

    pub fn empty() -> Self {
        finance_sheets_import::logging::init_test();
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data").join(WORKBOOK_ID)).unwrap();
        let (db_file, db_path) = create_test_db();
        Self {
            dir,
            db_file,
            db_path,
        }
    }

    pub fn source_root(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.dir.path().join("table_mapping.json")
    }

    pub fn write_mapping(&self, json: &str) {
        std::fs::write(self.mapping_path(), json).unwrap();
    }

    pub fn write_sheet(&self, sheet: &str, csv: &str) {
        let path = self.source_root().join(WORKBOOK_ID).join(format!("{}.csv", sheet));
        std::fs::write(path, csv).unwrap();
    }

    pub fn settings(&self) -> AppSettings {
        AppSettings {
            db_path: self.db_path.clone(),
            mapping_path: self.mapping_path(),
            workbook_id: Some(WORKBOOK_ID.to_string()),
            source: SourceKind::Csv,
            source_root: self.source_root(),
            ..AppSettings::default()
        }
    }
}

/// 记录取数顺序的 CSV 表格源
pub struct CountingSource {
    inner: CsvDirectorySource,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl CountingSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            inner: CsvDirectorySource::new(root),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl TabularSource for CountingSource {
    async fn fetch(&self, workbook_id: &str, sheet: &str) -> ImportResult<Option<RawDataset>> {
        self.fetched.lock().unwrap().push(sheet.to_string());
        self.inner.fetch(workbook_id, sheet).await
    }

    fn name(&self) -> &'static str {
        "counting-csv"
    }
}
