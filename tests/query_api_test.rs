// ==========================================
// 只读查询 API 测试
// ==========================================
// 在导入后的库上验证结构描述与只读约束

use finance_sheets_import::api::{ApiError, ImportApi, QueryApi};
use finance_sheets_import::config::ConfigManager;

mod test_helpers;
use test_helpers::TestWorkspace;

async fn imported_workspace() -> TestWorkspace {
    let workspace = TestWorkspace::with_sample_data();
    let report = ImportApi::new(ConfigManager::new(workspace.settings()))
        .run_import(&[])
        .await
        .unwrap();
    assert!(report.is_success());
    workspace
}

#[tokio::test]
async fn test_describe_schema_reports_declared_types() {
    let workspace = imported_workspace().await;
    let schema = QueryApi::new(&workspace.db_path).describe_schema().unwrap();

    assert_eq!(
        schema.tables.keys().collect::<Vec<_>>(),
        vec!["tb_contas", "tb_despesas", "tb_metas"]
    );

    let despesas = &schema.tables["tb_despesas"].columns;
    assert_eq!(
        despesas.keys().collect::<Vec<_>>(),
        vec!["descricao", "valor", "data", "realizado"]
    );
    assert_eq!(despesas["valor"].column_type, "DECIMAL(10,2)");
    assert!(!despesas["valor"].nullable);
    assert_eq!(despesas["data"].column_type, "DATE");
    assert!(despesas["data"].nullable);
    assert_eq!(despesas["realizado"].column_type, "BOOLEAN");

    let json = serde_json::to_value(&schema).unwrap();
    assert_eq!(json["tables"]["tb_metas"]["columns"]["prazo"]["type"], "INTEGER");
    assert_eq!(json["tables"]["tb_metas"]["columns"]["prazo"]["nullable"], false);
}

#[tokio::test]
async fn test_non_select_statements_are_rejected() {
    let workspace = imported_workspace().await;
    let api = QueryApi::new(&workspace.db_path);

    for sql in [
        "DELETE FROM tb_despesas",
        "UPDATE tb_despesas SET valor = 0",
        "CREATE TABLE tb_x (a INTEGER)",
        "SELECT 1; DROP TABLE tb_despesas",
    ] {
        let err = api.execute_read_only(sql).unwrap_err();
        assert!(matches!(err, ApiError::ReadOnlyViolation(_)), "{}", sql);
    }

    let rows = api
        .execute_read_only("SELECT COUNT(*) AS n FROM tb_despesas")
        .unwrap();
    assert_eq!(rows[0]["n"], 3);
}

#[tokio::test]
async fn test_aggregate_query() {
    let workspace = imported_workspace().await;
    let rows = QueryApi::new(&workspace.db_path)
        .execute_read_only(
            "SELECT SUM(valor) AS total FROM tb_despesas WHERE realizado = 1",
        )
        .unwrap();
    let total = rows[0]["total"].as_f64().unwrap();
    assert!((total - 1234.56).abs() < 1e-9);
}

#[tokio::test]
async fn test_distinct_values_for_prompt_context() {
    let workspace = imported_workspace().await;
    let names = QueryApi::new(&workspace.db_path)
        .distinct_values("tb_contas", "nome")
        .unwrap();
    assert_eq!(names, vec!["Carteira", "Nubank"]);
}

#[tokio::test]
async fn test_unknown_table_is_reported() {
    let workspace = imported_workspace().await;
    let err = QueryApi::new(&workspace.db_path)
        .execute_read_only("SELECT * FROM tb_investimentos")
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
