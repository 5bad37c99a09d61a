//! `vjson stream` — feed input chunk by chunk, showing field-level
//! progress while the "network" is still delivering.

use std::cell::RefCell;
use std::rc::Rc;

use vjson_core::ParserStatus;
use vjson_events::EventParser;

use crate::StreamArgs;

pub fn run(args: &StreamArgs) -> anyhow::Result<()> {
    let input = crate::read_input(args.file.as_ref())?;
    let chunk = args.chunk.max(1);

    let mut ep = EventParser::new();
    let skips: Vec<&str> = args.skip.iter().map(String::as_str).collect();
    if !skips.is_empty() {
        ep.skip(&skips)?;
    }

    // Queue printed lines from inside callbacks; flushed per feed.
    let lines = Rc::new(RefCell::new(Vec::<String>::new()));

    for path in &args.watch {
        let sink = lines.clone();
        let label = path.clone();
        ep.on(path, move |value| {
            sink.borrow_mut()
                .push(format!("value  {label} = {value}"));
        })?;
    }
    for path in &args.delta {
        let sink = lines.clone();
        let label = path.clone();
        ep.on_delta(path, move |delta| {
            sink.borrow_mut().push(format!(
                "delta  {label} += {:?} (bytes {}..{})",
                delta.chars,
                delta.offset,
                delta.offset + delta.len
            ));
        })?;
    }
    {
        let sink = lines.clone();
        ep.on_text(move |text| {
            sink.borrow_mut().push(format!("text   {text:?}"));
        });
    }

    let mut fed = 0;
    for piece in input.chunks(chunk) {
        fed += piece.len();
        let status = ep.feed(piece);
        for line in lines.borrow_mut().drain(..) {
            println!("{line}");
        }
        if status == ParserStatus::Error {
            let err = ep.error().expect("error status records a failure");
            anyhow::bail!("after {fed} bytes: {err}");
        }
    }
    ep.end();
    for line in lines.borrow_mut().drain(..) {
        println!("{line}");
    }

    match ep.status() {
        ParserStatus::Complete => println!("-- complete"),
        ParserStatus::CompleteEarly => {
            let tail = ep.remaining().unwrap_or_default();
            println!("-- complete-early, {} trailing bytes", tail.len());
        }
        ParserStatus::Incomplete => {
            if let Ok(Some(root)) = ep.value() {
                println!("-- incomplete; current value:");
                println!("{}", root.materialize().to_json_string());
            } else {
                println!("-- incomplete, no value yet");
            }
        }
        ParserStatus::Error => unreachable!("handled during feeding"),
    }
    Ok(())
}
