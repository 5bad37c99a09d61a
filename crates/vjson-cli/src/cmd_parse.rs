//! `vjson parse` — one-shot parse, value to stdout.

use anyhow::bail;
use vjson_core::{ParserStatus, parse, parse_single};
use vjson_tape::OwnedValue;

use crate::ParseArgs;

pub fn run(args: &ParseArgs) -> anyhow::Result<()> {
    let input = crate::read_input(args.file.as_ref())?;
    let parsed = if args.single {
        parse_single(&input)
    } else {
        parse(&input)
    };

    match parsed.status() {
        ParserStatus::Error => {
            let err = parsed.error().expect("error status records a failure");
            bail!("{err}");
        }
        status => {
            let Some(value) = parsed.materialize() else {
                bail!("empty input");
            };
            if args.pretty {
                println!("{}", serde_json::to_string_pretty(&to_serde(&value))?);
            } else {
                println!("{}", value.to_json_string());
            }
            match status {
                ParserStatus::Incomplete => eprintln!("status: incomplete (autocompleted)"),
                ParserStatus::CompleteEarly => {
                    let tail = parsed.remaining().unwrap_or_default();
                    eprintln!(
                        "status: complete-early ({} trailing bytes)",
                        tail.len()
                    );
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Bridge to `serde_json` for pretty printing.
fn to_serde(value: &OwnedValue) -> serde_json::Value {
    match value {
        OwnedValue::Null => serde_json::Value::Null,
        OwnedValue::Bool(b) => serde_json::Value::Bool(*b),
        OwnedValue::Int(v) => serde_json::Value::from(*v),
        OwnedValue::Uint(v) => serde_json::Value::from(*v),
        OwnedValue::Double(v) => serde_json::Number::from_f64(*v)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        OwnedValue::String(s) => serde_json::Value::String(s.clone()),
        OwnedValue::Array(items) => {
            serde_json::Value::Array(items.iter().map(to_serde).collect())
        }
        OwnedValue::Object(members) => serde_json::Value::Object(
            members
                .iter()
                .map(|(k, v)| (k.clone(), to_serde(v)))
                .collect(),
        ),
    }
}
