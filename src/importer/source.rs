// ==========================================
// 个人财务表格导入 - 外部表格源实现
// ==========================================
// 支持: CSV 目录 / Excel 工作簿 (.xlsx) / 在线表格 (Sheets API values 接口)
// 约定: 表头与文本值去除首尾空白，整行为空的数据行跳过
// ==========================================

use crate::domain::dataset::{RawCell, RawDataset, RawRow};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::TabularSource;
use async_trait::async_trait;
use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::ReaderBuilder;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 在线表格 API 的默认地址
pub const GOOGLE_SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// ==========================================
// 通用: CSV 文本 → RawDataset
// ==========================================

/// 解析 CSV（首行为表头）
///
/// # 返回
/// - Ok(None): 没有表头
pub fn parse_csv_dataset<R: Read>(reader: R) -> ImportResult<Option<RawDataset>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // 允许行长度不一致
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Ok(None);
    }
    check_headers(&headers)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), RawCell::from_text(value)))
            .collect();

        // 跳过完全空白的行
        if row.values().all(RawCell::is_empty) {
            continue;
        }
        rows.push(row);
    }

    Ok(Some(RawDataset::new(headers, rows)))
}

/// 表头不得为空或重复
fn check_headers(headers: &[String]) -> ImportResult<()> {
    let mut seen = HashSet::new();
    for (idx, header) in headers.iter().enumerate() {
        if header.is_empty() {
            return Err(ImportError::CsvParseError(format!("第 {} 列表头为空", idx + 1)));
        }
        if !seen.insert(header.as_str()) {
            return Err(ImportError::CsvParseError(format!("表头重复: {}", header)));
        }
    }
    Ok(())
}

/// 首行为表头的单元格矩阵 → RawDataset
///
/// 表头右侧的空白列被截掉，整行为空的数据行跳过。
fn dataset_from_grid<I>(header_row: Vec<String>, data_rows: I) -> ImportResult<Option<RawDataset>>
where
    I: IntoIterator<Item = Vec<RawCell>>,
{
    let width = header_row.iter().rposition(|h| !h.is_empty()).map_or(0, |i| i + 1);
    if width == 0 {
        return Ok(None);
    }
    let headers: Vec<String> = header_row.into_iter().take(width).collect();
    check_headers(&headers)?;

    let mut rows = Vec::new();
    for cells in data_rows {
        let mut cells = cells.into_iter();
        let row: RawRow = headers
            .iter()
            .map(|header| (header.clone(), cells.next().unwrap_or(RawCell::Empty)))
            .collect();
        if row.values().all(RawCell::is_empty) {
            continue;
        }
        rows.push(row);
    }

    Ok(Some(RawDataset::new(headers, rows)))
}

// ==========================================
// CSV 目录源: <root>/<workbook_id>/<sheet>.csv
// ==========================================
pub struct CsvDirectorySource {
    root: PathBuf,
}

impl CsvDirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn sheet_path(&self, workbook_id: &str, sheet: &str) -> PathBuf {
        self.root.join(workbook_id).join(format!("{}.csv", sheet))
    }
}

#[async_trait]
impl TabularSource for CsvDirectorySource {
    async fn fetch(&self, workbook_id: &str, sheet: &str) -> ImportResult<Option<RawDataset>> {
        let path = self.sheet_path(workbook_id, sheet);
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        debug!(path = %path.display(), "读取 CSV 表格");

        let file = std::fs::File::open(&path)?;
        parse_csv_dataset(file)
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

// ==========================================
// Excel 工作簿源: <root>/<workbook_id>.xlsx，表格 = 工作表
// ==========================================
pub struct ExcelWorkbookSource {
    root: PathBuf,
}

impl ExcelWorkbookSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn workbook_path(&self, workbook_id: &str) -> PathBuf {
        self.root.join(format!("{}.xlsx", workbook_id))
    }

    fn read_sheet(path: &Path, sheet: &str) -> ImportResult<Option<RawDataset>> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        if !workbook.sheet_names().iter().any(|name| name == sheet) {
            return Err(ImportError::FetchFailed {
                sheet: sheet.to_string(),
                message: format!("工作簿 {} 中没有该工作表", path.display()),
            });
        }
        let range = workbook.worksheet_range(sheet)?;

        let mut rows = range.rows();
        let header_row: Vec<String> = match rows.next() {
            Some(row) => row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect(),
            None => return Ok(None),
        };

        dataset_from_grid(header_row, rows.map(|row| row.iter().map(excel_cell).collect::<Vec<_>>()))
    }
}

/// Excel 单元格 → RawCell（数值/布尔保留原生类型）
fn excel_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::Int(v) => RawCell::Number(*v as f64),
        Data::Float(v) => RawCell::Number(*v),
        Data::Bool(v) => RawCell::Bool(*v),
        Data::String(s) => RawCell::from_text(s),
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        other => RawCell::from_text(&other.to_string()),
    }
}

#[async_trait]
impl TabularSource for ExcelWorkbookSource {
    async fn fetch(&self, workbook_id: &str, sheet: &str) -> ImportResult<Option<RawDataset>> {
        let path = self.workbook_path(workbook_id);
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        debug!(path = %path.display(), sheet = %sheet, "读取 Excel 工作表");
        Self::read_sheet(&path, sheet)
    }

    fn name(&self) -> &'static str {
        "excel"
    }
}

// ==========================================
// 在线表格源: GET {base}/{id}/values/'{sheet}'
// ==========================================
// 认证在此之外完成，这里只携带可选的 Bearer Token
pub struct GoogleSheetsSource {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

/// values 接口的响应体（只取用到的字段）
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsSource {
    pub fn new(bearer_token: Option<String>) -> Self {
        Self::with_base_url(GOOGLE_SHEETS_API_URL, bearer_token)
    }

    pub fn with_base_url(base_url: &str, bearer_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token,
        }
    }

    /// 工作表整表读取地址（表名加引号，路径段自动转义）
    pub fn values_url(&self, workbook_id: &str, sheet: &str) -> ImportResult<reqwest::Url> {
        let invalid = || ImportError::Config(format!("在线表格地址非法: {}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(workbook_id)
            .push("values")
            .push(&format!("'{}'", sheet.replace('\'', "''")));
        Ok(url)
    }
}

/// values 接口响应 → RawDataset（首行为表头，短行右侧补空）
pub fn parse_values_response(sheet: &str, body: &str) -> ImportResult<Option<RawDataset>> {
    let range: ValueRange = serde_json::from_str(body).map_err(|e| ImportError::FetchFailed {
        sheet: sheet.to_string(),
        message: format!("响应无法解析: {}", e),
    })?;

    let mut rows = range.values.into_iter();
    let header_row: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(|v| json_cell_text(v).trim().to_string()).collect(),
        None => return Ok(None),
    };

    dataset_from_grid(header_row, rows.map(|row| row.iter().map(json_cell).collect::<Vec<_>>()))
}

fn json_cell(value: &Value) -> RawCell {
    match value {
        Value::Null => RawCell::Empty,
        Value::Bool(b) => RawCell::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(RawCell::Empty, RawCell::Number),
        other => RawCell::from_text(&json_cell_text(other)),
    }
}

fn json_cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 错误响应中的 error.message，取不到时用原始响应体
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl TabularSource for GoogleSheetsSource {
    async fn fetch(&self, workbook_id: &str, sheet: &str) -> ImportResult<Option<RawDataset>> {
        let url = self.values_url(workbook_id, sheet)?;
        debug!(url = %url, sheet = %sheet, "下载在线表格");

        let mut request = self.client.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // 表名不存在时接口返回 400 (Unable to parse range)
            return Err(ImportError::FetchFailed {
                sheet: sheet.to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), api_error_message(&body)),
            });
        }

        parse_values_response(sheet, &body)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_csv_dataset_basic() {
        let csv = "Descrição,Valor,Realizado\nMercado,\"R$ 1.234,56\",TRUE\n Aluguel , R$ 900,00 ,false\n";
        let dataset = parse_csv_dataset(csv.as_bytes()).unwrap().unwrap();

        assert_eq!(dataset.columns, vec!["Descrição", "Valor", "Realizado"]);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(
            dataset.rows[0].get("Valor"),
            Some(&RawCell::Text("R$ 1.234,56".to_string()))
        );
        assert_eq!(
            dataset.rows[1].get("Descrição"),
            Some(&RawCell::Text("Aluguel".to_string()))
        );
    }

    #[test]
    fn test_parse_csv_dataset_skip_empty_rows() {
        let csv = "Nome,Valor\nA,1\n,\nB,2\n";
        let dataset = parse_csv_dataset(csv.as_bytes()).unwrap().unwrap();
        assert_eq!(dataset.row_count(), 2);
    }

    #[test]
    fn test_parse_csv_dataset_blank_cells_are_empty() {
        let csv = "Nome,Valor\nA,\n";
        let dataset = parse_csv_dataset(csv.as_bytes()).unwrap().unwrap();
        assert_eq!(dataset.rows[0].get("Valor"), Some(&RawCell::Empty));
    }

    #[test]
    fn test_parse_csv_dataset_no_header() {
        assert!(parse_csv_dataset("".as_bytes()).unwrap().is_none());
    }

    #[test]
    fn test_parse_csv_dataset_duplicate_header() {
        let csv = "Nome,Nome\nA,B\n";
        assert!(parse_csv_dataset(csv.as_bytes()).is_err());
    }

    #[tokio::test]
    async fn test_csv_directory_source_reads_sheet() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("financas")).unwrap();
        let mut file = std::fs::File::create(dir.path().join("financas").join("Contas.csv")).unwrap();
        writeln!(file, "Nome,Saldo Inicial").unwrap();
        writeln!(file, "Nubank,\"R$ 10,00\"").unwrap();

        let source = CsvDirectorySource::new(dir.path());
        let dataset = source.fetch("financas", "Contas").await.unwrap().unwrap();
        assert_eq!(dataset.row_count(), 1);
        assert_eq!(
            dataset.rows[0].get("Nome"),
            Some(&RawCell::Text("Nubank".to_string()))
        );
    }

    #[tokio::test]
    async fn test_csv_directory_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let source = CsvDirectorySource::new(dir.path());
        let result = source.fetch("financas", "Inexistente").await;
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_excel_source_missing_workbook() {
        let dir = TempDir::new().unwrap();
        let source = ExcelWorkbookSource::new(dir.path());
        let result = source.fetch("financas", "Contas").await;
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    fn fixture_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join("datasets")
    }

    #[tokio::test]
    async fn test_excel_source_keeps_native_cell_kinds() {
        let source = ExcelWorkbookSource::new(fixture_root());
        let dataset = source.fetch("financas", "Despesas").await.unwrap().unwrap();

        // 表头去空白，右侧无表头的列被截掉
        assert_eq!(dataset.columns, vec!["Descrição", "Valor", "Data", "Realizado"]);
        // 第 3 行整行为空，被跳过
        assert_eq!(dataset.row_count(), 2);

        let mercado = &dataset.rows[0];
        assert_eq!(mercado.get("Descrição"), Some(&RawCell::Text("Mercado".to_string())));
        assert_eq!(mercado.get("Valor"), Some(&RawCell::Number(1234.56)));
        // 日期格式单元格 → 序列日期数值（2024-01-15）
        assert_eq!(mercado.get("Data"), Some(&RawCell::Number(45306.0)));
        assert_eq!(mercado.get("Realizado"), Some(&RawCell::Bool(true)));

        let aluguel = &dataset.rows[1];
        assert_eq!(aluguel.get("Valor"), Some(&RawCell::Text("R$ 900,00".to_string())));
        assert_eq!(aluguel.get("Data"), Some(&RawCell::Empty));
        assert_eq!(aluguel.get("Realizado"), Some(&RawCell::Bool(false)));
    }

    #[tokio::test]
    async fn test_excel_source_missing_worksheet_names_the_sheet() {
        let source = ExcelWorkbookSource::new(fixture_root());
        match source.fetch("financas", "Investimentos").await {
            Err(ImportError::FetchFailed { sheet, .. }) => assert_eq!(sheet, "Investimentos"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_excel_source_empty_worksheet_has_no_dataset() {
        let source = ExcelWorkbookSource::new(fixture_root());
        assert!(source.fetch("financas", "Vazia").await.unwrap().is_none());
    }

    #[test]
    fn test_google_values_url_quotes_sheet_name() {
        let source = GoogleSheetsSource::with_base_url("http://localhost:9999/v4/spreadsheets/", None);
        let url = source.values_url("abc123", "Contas Pessoais").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9999/v4/spreadsheets/abc123/values/'Contas%20Pessoais'"
        );
    }

    #[test]
    fn test_parse_values_response() {
        let body = r#"{
            "range": "'Despesas'!A1:Z1000",
            "majorDimension": "ROWS",
            "values": [
                [" Descrição ", "Valor", "Realizado", ""],
                ["Mercado", "R$ 1.234,56", "TRUE"],
                ["", "", ""],
                ["Cinema", 45.9, true, "solto"]
            ]
        }"#;
        let dataset = parse_values_response("Despesas", body).unwrap().unwrap();

        assert_eq!(dataset.columns, vec!["Descrição", "Valor", "Realizado"]);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(
            dataset.rows[0].get("Valor"),
            Some(&RawCell::Text("R$ 1.234,56".to_string()))
        );
        assert_eq!(dataset.rows[1].get("Valor"), Some(&RawCell::Number(45.9)));
        assert_eq!(dataset.rows[1].get("Realizado"), Some(&RawCell::Bool(true)));
    }

    #[test]
    fn test_parse_values_response_short_rows_and_empty_sheet() {
        let body = r#"{"values": [["Nome", "Saldo", "Ativo"], ["Nubank"]]}"#;
        let dataset = parse_values_response("Contas", body).unwrap().unwrap();
        assert_eq!(dataset.rows[0].get("Saldo"), Some(&RawCell::Empty));
        assert_eq!(dataset.rows[0].get("Ativo"), Some(&RawCell::Empty));

        // 空工作表的响应不含 values 字段
        let empty = r#"{"range": "'Metas'!A1:Z1000", "majorDimension": "ROWS"}"#;
        assert!(parse_values_response("Metas", empty).unwrap().is_none());
    }

    #[test]
    fn test_parse_values_response_rejects_garbage() {
        match parse_values_response("Metas", "<html>login</html>") {
            Err(ImportError::FetchFailed { sheet, .. }) => assert_eq!(sheet, "Metas"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 400, "message": "Unable to parse range: 'Inexistente'", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "Unable to parse range: 'Inexistente'");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }
}
