use std::fs;
use std::time::Instant;

use serde::Serialize;
use tickref_warehouse::{CatalogDocument, ImportReport, Warehouse};
use tracing::info;

use crate::cli::CatalogImportArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ImportResponseData {
    file: String,
    imported: ImportReport,
    total: usize,
}

pub fn run_import(args: &CatalogImportArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let input = fs::read_to_string(&args.file)?;
    let document = CatalogDocument::from_json(&input)?;

    let report = warehouse.import_document(&document)?;
    info!(file = %args.file.display(), rows = report.total(), "imported catalog");

    let mut warnings = Vec::new();
    if report.total() == 0 {
        warnings.push(String::from("catalog already contained every row; nothing written"));
    }

    let data = serde_json::to_value(ImportResponseData {
        file: args.file.display().to_string(),
        total: report.total(),
        imported: report,
    })?;
    Ok(CommandResult::ok(data)
        .with_warnings(warnings)
        .with_catalog(warehouse)
        .with_latency(started))
}

pub fn run_export(warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let document = warehouse.export_document()?;

    let data = serde_json::to_value(document)?;
    Ok(CommandResult::ok(data)
        .with_catalog(warehouse)
        .with_latency(started))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tickref_warehouse::WarehouseConfig;

    #[test]
    fn import_then_export() {
        let temp = tempdir().expect("tempdir");
        let warehouse = Warehouse::open(WarehouseConfig::at_home(temp.path())).expect("warehouse");
        let file = temp.path().join("catalog.json");
        fs::write(
            &file,
            r#"{"tags": [{"tag": "rates", "strategy_filters": ["^ed"]}], "eod_spreads": ["ED1_2"]}"#,
        )
        .expect("write");

        let args = CatalogImportArgs { file: file.clone() };
        let first = run_import(&args, &warehouse).expect("import");
        assert_eq!(first.data["total"], 3);
        assert!(first.warnings.is_empty());

        let second = run_import(&args, &warehouse).expect("reimport");
        assert_eq!(second.data["total"], 0);
        assert_eq!(second.warnings.len(), 1);

        let exported = run_export(&warehouse).expect("export");
        assert_eq!(exported.data["tags"][0]["strategy_filters"], serde_json::json!(["^ed"]));
        assert_eq!(exported.data["eod_spreads"], serde_json::json!(["ED1_2"]));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = tempdir().expect("tempdir");
        let warehouse = Warehouse::open(WarehouseConfig::at_home(temp.path())).expect("warehouse");

        let args = CatalogImportArgs {
            file: temp.path().join("missing.json"),
        };
        let error = run_import(&args, &warehouse).expect_err("must fail");
        assert_eq!(error.exit_code(), 10);
    }
}
