use std::time::Instant;

use serde::Serialize;
use tickref_core::{Canonicalizer, NameKind, SortKey};

use crate::cli::NamesArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct CanonicalName {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<NameKind>,
    sort_key: SortKey,
}

#[derive(Debug, Serialize)]
struct CanonicalizeResponseData {
    names: Vec<CanonicalName>,
}

#[derive(Debug, Serialize)]
struct SortResponseData {
    names: Vec<String>,
}

pub fn run_canonicalize(args: &NamesArgs) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let canonicalizer = Canonicalizer::default();

    let names = checked_names(args)?
        .into_iter()
        .map(|name| CanonicalName {
            kind: canonicalizer.classify(name),
            sort_key: canonicalizer.canonicalize(name),
            name: name.to_owned(),
        })
        .collect();

    let data = serde_json::to_value(CanonicalizeResponseData { names })?;
    Ok(CommandResult::ok(data).with_latency(started))
}

pub fn run_sort(args: &NamesArgs) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let names = Canonicalizer::default().sort_names(checked_names(args)?);

    let data = serde_json::to_value(SortResponseData { names })?;
    Ok(CommandResult::ok(data).with_latency(started))
}

fn checked_names(args: &NamesArgs) -> Result<Vec<&str>, CliError> {
    let names: Vec<&str> = args.names.iter().map(|name| name.trim()).collect();
    if names.iter().any(|name| name.is_empty()) {
        return Err(CliError::Command(String::from("names must not be empty")));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(names: &[&str]) -> NamesArgs {
        NamesArgs {
            names: names.iter().map(|name| (*name).to_owned()).collect(),
        }
    }

    #[test]
    fn sort_orders_by_expiration() {
        let result = run_sort(&args(&["EDH24", "EDZ23", "EDH23", "EDM23"])).expect("sort");
        assert_eq!(
            result.data,
            serde_json::json!({ "names": ["EDH23", "EDM23", "EDZ23", "EDH24"] })
        );
    }

    #[test]
    fn canonicalize_reports_kind_and_key() {
        let result = run_canonicalize(&args(&["USDT3MDX", "EDH23"])).expect("canonicalize");
        assert_eq!(result.data["names"][0]["kind"], "TDX");
        assert_eq!(result.data["names"][0]["sort_key"], "USDTDX00090");
        assert!(result.data["names"][1].get("kind").is_none());
        assert_eq!(result.data["names"][1]["sort_key"], "ED202303");
    }

    #[test]
    fn blank_names_are_rejected() {
        let error = run_sort(&args(&["EDH23", "  "])).expect_err("must fail");
        assert_eq!(error.exit_code(), 2);
    }
}
