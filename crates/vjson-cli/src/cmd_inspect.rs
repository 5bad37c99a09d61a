//! `vjson inspect` — human-readable tape dump.

use vjson_core::parse;
use vjson_tape::{Tape, TokenKind};

use crate::InspectArgs;

pub fn run(args: &InspectArgs) -> anyhow::Result<()> {
    let input = crate::read_input(args.file.as_ref())?;
    let parsed = parse(&input);

    if let Some(err) = parsed.error() {
        anyhow::bail!("{err}");
    }
    if parsed.value().is_none() {
        anyhow::bail!("empty input");
    }
    print!("{}", dump_tape(parsed.tape(), parsed.source()));
    Ok(())
}

/// Render every token, one line each, with synthetic markers.
pub fn dump_tape(tape: &Tape, source: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    for (idx, token) in tape.tokens().iter().enumerate() {
        let synth = if token.synthetic { " (synthetic)" } else { "" };
        let span = format!("{}..{}", token.span.start, token.span.end);
        let desc = match token.kind {
            TokenKind::Null => "null".to_string(),
            TokenKind::True => "true".to_string(),
            TokenKind::False => "false".to_string(),
            TokenKind::Int(v) => format!("int {v}"),
            TokenKind::Uint(v) => format!("uint {v}"),
            TokenKind::Double(v) => format!("double {v}"),
            TokenKind::Str(sref) => format!(
                "string {:?}",
                String::from_utf8_lossy(tape.str_bytes(sref, source))
            ),
            TokenKind::Key(sref) => format!(
                "key {:?}",
                String::from_utf8_lossy(tape.str_bytes(sref, source))
            ),
            TokenKind::ObjectOpen { close, count } => {
                format!("object-open close={close} count={count}")
            }
            TokenKind::ObjectClose { open } => format!("object-close open={open}"),
            TokenKind::ArrayOpen { close, count } => {
                format!("array-open close={close} count={count}")
            }
            TokenKind::ArrayClose { open } => format!("array-close open={open}"),
        };
        writeln!(out, "{idx:<4}  {desc:<40} {span}{synth}").expect("writing to a String");
    }
    out
}
