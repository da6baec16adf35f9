use std::time::Instant;

use serde::Serialize;
use tickref_core::{TagResolution, TagResolver};
use tickref_warehouse::Warehouse;

use crate::cli::ResolveArgs;
use crate::error::CliError;

use super::{failure_errors, resolve_catalog, CommandResult};

#[derive(Debug, Serialize)]
struct ResolveResponseData<'a> {
    tags: Vec<&'a TagResolution>,
}

pub fn run(
    args: &ResolveArgs,
    warehouse: &Warehouse,
    resolver: &TagResolver,
) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let (resolution, cache_hit) = resolve_catalog(warehouse, resolver)?;

    let mut warnings = Vec::new();
    let tags: Vec<&TagResolution> = if args.tags.is_empty() {
        resolution.tags.values().collect()
    } else {
        args.tags
            .iter()
            .filter_map(|tag| {
                let found = resolution.get(tag);
                if found.is_none() {
                    warnings.push(format!("unknown tag '{tag}'"));
                }
                found
            })
            .collect()
    };

    let data = serde_json::to_value(ResolveResponseData { tags })?;
    Ok(CommandResult::ok(data)
        .with_warnings(warnings)
        .with_errors(failure_errors(&resolution, &args.tags))
        .with_cache_hit(cache_hit)
        .with_catalog(warehouse)
        .with_latency(started))
}
