use std::collections::BTreeSet;
use std::time::Instant;

use serde::Serialize;
use tickref_core::{spread_tag_instrument, IndexScope};
use tickref_warehouse::Warehouse;

use crate::cli::{InstrumentTagsArgs, SpreadTagsArgs};
use crate::error::CliError;

use super::{failure_errors, resolve_catalog, resolver_for_scope, CommandResult};

#[derive(Debug, Serialize)]
struct InstrumentTagsResponseData {
    instrument: String,
    scope: IndexScope,
    tags: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
struct SpreadTagsResponseData {
    spread: String,
    instrument: String,
    tags: BTreeSet<String>,
}

pub fn run_instrument_tags(
    args: &InstrumentTagsArgs,
    warehouse: &Warehouse,
) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let instrument = required("instrument", &args.instrument)?;
    let resolver = resolver_for_scope(args.synthetic);

    let (resolution, cache_hit) = resolve_catalog(warehouse, &resolver)?;
    let index = resolver.instrument_index(&resolution);
    let errors = failure_errors(&resolution, &[]);

    let data = serde_json::to_value(InstrumentTagsResponseData {
        instrument: instrument.to_owned(),
        scope: resolver.config().index_scope,
        tags: index.instrument_tags(instrument),
    })?;
    Ok(CommandResult::ok(data)
        .with_warnings(incomplete_warning(errors.len()))
        .with_errors(errors)
        .with_cache_hit(cache_hit)
        .with_catalog(warehouse)
        .with_latency(started))
}

pub fn run_spread_tags(args: &SpreadTagsArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let spread = required("spread", &args.spread)?;
    let resolver = resolver_for_scope(false);

    let (resolution, cache_hit) = resolve_catalog(warehouse, &resolver)?;
    let index = resolver.instrument_index(&resolution);
    let errors = failure_errors(&resolution, &[]);

    let data = serde_json::to_value(SpreadTagsResponseData {
        spread: spread.to_owned(),
        instrument: spread_tag_instrument(spread),
        tags: index.spread_tags(spread),
    })?;
    Ok(CommandResult::ok(data)
        .with_warnings(incomplete_warning(errors.len()))
        .with_errors(errors)
        .with_cache_hit(cache_hit)
        .with_catalog(warehouse)
        .with_latency(started))
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, CliError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CliError::Command(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn incomplete_warning(failures: usize) -> Vec<String> {
    if failures == 0 {
        return Vec::new();
    }
    vec![format!(
        "{failures} tag filter(s) failed to compile; tags may be missing"
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tickref_warehouse::{CatalogDocument, WarehouseConfig};

    fn warehouse(temp: &tempfile::TempDir) -> Warehouse {
        let warehouse = Warehouse::open(WarehouseConfig::at_home(temp.path())).expect("warehouse");
        let document = CatalogDocument::from_json(
            r#"{
                "tags": [
                    {"tag": "rates", "products": [{"product": "ED", "product_type": "Outright"}],
                     "strategy_filters": ["_cal$"]},
                    {"tag": "spreads", "instruments": ["EDG1_2NR"]}
                ],
                "instruments": [
                    {"instrument": "EDH23", "product": "ED", "product_type": "Outright"},
                    {"instrument": "EDG1_2NR", "product": "ED", "product_type": "Outright"}
                ],
                "eod_strategies": ["EDH23_Cal"]
            }"#,
        )
        .expect("document");
        warehouse.import_document(&document).expect("import");
        warehouse
    }

    #[test]
    fn instrument_tags_use_inherited_scope_by_default() {
        let temp = tempdir().expect("tempdir");
        let warehouse = warehouse(&temp);

        let args = InstrumentTagsArgs {
            instrument: String::from("EDH23"),
            synthetic: false,
        };
        let result = run_instrument_tags(&args, &warehouse).expect("lookup");
        assert_eq!(result.data["tags"], serde_json::json!(["rates"]));
        assert_eq!(result.data["scope"], "inherited");

        let strategy = InstrumentTagsArgs {
            instrument: String::from("EDH23_Cal"),
            synthetic: false,
        };
        let result = run_instrument_tags(&strategy, &warehouse).expect("lookup");
        assert_eq!(result.data["tags"], serde_json::json!([]));
    }

    #[test]
    fn synthetic_scope_covers_strategies() {
        let temp = tempdir().expect("tempdir");
        let warehouse = warehouse(&temp);

        let args = InstrumentTagsArgs {
            instrument: String::from("EDH23_Cal"),
            synthetic: true,
        };
        let result = run_instrument_tags(&args, &warehouse).expect("lookup");
        assert_eq!(result.data["tags"], serde_json::json!(["rates"]));
        assert_eq!(result.data["scope"], "with_synthetic");
    }

    #[test]
    fn spread_tags_go_through_market_data_name() {
        let temp = tempdir().expect("tempdir");
        let warehouse = warehouse(&temp);

        let args = SpreadTagsArgs {
            spread: String::from("ED1_2"),
        };
        let result = run_spread_tags(&args, &warehouse).expect("lookup");
        assert_eq!(result.data["instrument"], "EDG1_2NR");
        assert_eq!(result.data["tags"], serde_json::json!(["rates", "spreads"]));
        assert!(result.warnings.is_empty());
    }
}
