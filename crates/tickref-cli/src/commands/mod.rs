mod canonicalize;
mod catalog;
mod lookup;
mod resolve;

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tickref_core::{
    CatalogSource, Envelope, EnvelopeError, IndexScope, Resolution, ResolverConfig, TagResolver,
};
use tickref_warehouse::{Warehouse, WarehouseConfig};
use tracing::debug;

use crate::cli::{CatalogCommand, Cli, Command};
use crate::error::CliError;
use crate::metadata::{Metadata, SCHEMA_VERSION};

#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub catalog: Option<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            catalog: None,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, started: Instant) -> Self {
        self.latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }

    pub fn with_catalog(mut self, warehouse: &Warehouse) -> Self {
        self.catalog = Some(warehouse.db_path().display().to_string());
        self
    }
}

pub fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let command_result = match &cli.command {
        Command::Canonicalize(args) => canonicalize::run_canonicalize(args)?,
        Command::Sort(args) => canonicalize::run_sort(args)?,
        Command::Resolve(args) => {
            let warehouse = open_warehouse(cli)?;
            resolve::run(args, &warehouse, &TagResolver::default())?
        }
        Command::InstrumentTags(args) => {
            let warehouse = open_warehouse(cli)?;
            lookup::run_instrument_tags(args, &warehouse)?
        }
        Command::SpreadTags(args) => {
            let warehouse = open_warehouse(cli)?;
            lookup::run_spread_tags(args, &warehouse)?
        }
        Command::Catalog(args) => {
            let warehouse = open_warehouse(cli)?;
            match &args.command {
                CatalogCommand::Import(import_args) => catalog::run_import(import_args, &warehouse)?,
                CatalogCommand::Export => catalog::run_export(&warehouse)?,
            }
        }
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        cache_hit,
        catalog,
    } = command_result;

    let mut metadata = Metadata::new(catalog, latency_ms, cache_hit);
    for warning in warnings {
        metadata.push_warning(warning);
    }

    let meta = metadata.into_envelope_meta(SCHEMA_VERSION)?;
    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let mut config = WarehouseConfig::default();
    if let Some(db) = &cli.db {
        config = config.with_db_path(db.clone());
    }
    debug!(db = %config.db_path.display(), "opening catalog warehouse");
    Ok(Warehouse::open(config)?)
}

/// Snapshot the warehouse and resolve every tag.
///
/// Returns the resolution and whether it came from the resolver's cache.
/// `run` builds a fresh resolver per invocation, so the binary always reports
/// a miss; hits only happen when one resolver serves several commands.
fn resolve_catalog(
    warehouse: &Warehouse,
    resolver: &TagResolver,
) -> Result<(Arc<Resolution>, bool), CliError> {
    let snapshot = warehouse.snapshot()?;
    let cache_hit = resolver.is_cached(&snapshot);
    Ok((resolver.resolve_snapshot(&snapshot), cache_hit))
}

/// Filter failures as envelope errors, optionally limited to `tags`.
fn failure_errors(resolution: &Resolution, tags: &[String]) -> Vec<EnvelopeError> {
    if tags.is_empty() {
        return resolution.failures.iter().map(EnvelopeError::from).collect();
    }
    tags.iter()
        .flat_map(|tag| resolution.failures_for(tag))
        .map(EnvelopeError::from)
        .collect()
}

fn resolver_for_scope(synthetic: bool) -> TagResolver {
    let scope = if synthetic {
        IndexScope::WithSynthetic
    } else {
        IndexScope::Inherited
    };
    TagResolver::new(ResolverConfig {
        index_scope: scope,
        ..ResolverConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickref_core::{TagCatalog, Universes};

    #[test]
    fn failure_errors_follow_selected_tags() {
        let mut catalog = TagCatalog::new();
        catalog
            .add_strategy_filter("rates", "[bad")
            .add_custom_filter("fx", "(open");
        let resolution = TagResolver::default().resolve(&catalog, &Universes::new());

        assert_eq!(failure_errors(&resolution, &[]).len(), 2);
        let selected = failure_errors(&resolution, &[String::from("fx")]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].tag.as_deref(), Some("fx"));
        assert_eq!(selected[0].code, "invalid_filter_pattern");
    }
}
