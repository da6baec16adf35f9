use tickref_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Ndjson => {
            for line in ndjson_lines(envelope)? {
                println!("{line}");
            }
        }
        OutputFormat::Table => render_table(envelope)?,
    }

    Ok(())
}

/// One line for the metadata, one per data item when `data` holds an array
/// under its first array-valued field, then one per error.
fn ndjson_lines(envelope: &Envelope<Value>) -> Result<Vec<String>, CliError> {
    let mut lines = vec![serde_json::to_string(&serde_json::json!({ "meta": envelope.meta }))?];

    match items(&envelope.data) {
        Some(items) => {
            for item in items {
                lines.push(serde_json::to_string(&serde_json::json!({ "item": item }))?);
            }
        }
        None => lines.push(serde_json::to_string(&serde_json::json!({ "data": envelope.data }))?),
    }

    for error in &envelope.errors {
        lines.push(serde_json::to_string(&serde_json::json!({ "error": error }))?);
    }
    Ok(lines)
}

fn items(data: &Value) -> Option<&Vec<Value>> {
    match data {
        Value::Array(items) => Some(items),
        Value::Object(fields) => fields.values().find_map(Value::as_array),
        _ => None,
    }
}

fn render_table(envelope: &Envelope<Value>) -> Result<(), CliError> {
    println!("request_id  : {}", envelope.meta.request_id);
    if let Some(trace_id) = &envelope.meta.trace_id {
        println!("trace_id    : {trace_id}");
    }
    println!("schema      : {}", envelope.meta.schema_version);
    println!("generated_at: {}", envelope.meta.generated_at);
    if let Some(catalog) = &envelope.meta.catalog {
        println!("catalog     : {catalog}");
    }
    println!("latency_ms  : {}", envelope.meta.latency_ms);
    println!("cache_hit   : {}", envelope.meta.cache_hit);

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    println!("data:");
    let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
    for line in pretty_data.lines() {
        println!("  {line}");
    }

    if !envelope.errors.is_empty() {
        println!("errors:");
        for error in &envelope.errors {
            match &error.tag {
                Some(tag) => println!("  - {} [{tag}]: {}", error.code, error.message),
                None => println!("  - {}: {}", error.code, error.message),
            }
        }
    }

    Ok(())
}
