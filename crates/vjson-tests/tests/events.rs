//! Event dispatch under streaming conditions: byte-at-a-time feeds,
//! interleaved subscriptions, multi-root streams and the prose seeker.

use std::cell::RefCell;
use std::rc::Rc;

use vjson_events::{EventParser, EventParserOptions, Format, OwnedValue};

fn sink<T: 'static>() -> (Rc<RefCell<Vec<T>>>, Rc<RefCell<Vec<T>>>) {
    let store = Rc::new(RefCell::new(Vec::new()));
    (store.clone(), store)
}

/// Deltas concatenate to the decoded string no matter the chunking.
#[test]
fn deltas_reassemble_under_any_chunking() {
    let doc = br#"{"code":"let x = 1;\nlet y = \"two\";"}"#;
    for chunk in [1usize, 2, 3, 7, 16] {
        let mut ep = EventParser::new();
        let (got, push) = sink::<String>();
        ep.on_delta("code", move |d| push.borrow_mut().push(d.chars.to_string()))
            .unwrap();

        for piece in doc.chunks(chunk) {
            ep.feed(piece);
        }
        let reassembled: String = got.borrow().concat();
        assert_eq!(reassembled, "let x = 1;\nlet y = \"two\";", "chunk {chunk}");
    }
}

/// Delta source offsets and lengths tile the string's byte range.
#[test]
fn delta_offsets_tile_the_source() {
    let doc = br#"{"msg":"abcdefghij"}"#;
    let mut ep = EventParser::new();
    let (got, push) = sink::<(usize, usize)>();
    ep.on_delta("msg", move |d| push.borrow_mut().push((d.offset, d.len)))
        .unwrap();

    for piece in doc.chunks(3) {
        ep.feed(piece);
    }

    let ranges = got.borrow();
    // Contiguous, in order, starting right after the open quote and
    // ending right before the close quote.
    assert_eq!(ranges.first().unwrap().0, 8);
    let mut cursor = 8;
    for (offset, len) in ranges.iter() {
        assert_eq!(*offset, cursor);
        cursor += len;
    }
    assert_eq!(cursor, 18);
}

/// Value events fire in left-to-right textual order.
#[test]
fn value_event_ordering() {
    let mut ep = EventParser::new();
    let (order, push) = sink::<String>();
    ep.on("items[*]", move |v| push.borrow_mut().push(v.to_json_string()))
        .unwrap();

    ep.feed(br#"{"items":["a","b","c"]}"#);
    assert_eq!(
        order.borrow().as_slice(),
        &[r#""a""#.to_string(), r#""b""#.to_string(), r#""c""#.to_string()]
    );
}

/// One value can feed several subscriptions; each fires independently.
#[test]
fn overlapping_subscriptions() {
    let mut ep = EventParser::new();
    let (wild, wild_push) = sink::<String>();
    let (exact, exact_push) = sink::<String>();
    ep.on("*", move |v| wild_push.borrow_mut().push(v.to_json_string()))
        .unwrap();
    ep.on("b", move |v| exact_push.borrow_mut().push(v.to_json_string()))
        .unwrap();

    ep.feed(br#"{"a":1,"b":2}"#);
    assert_eq!(wild.borrow().len(), 2);
    assert_eq!(exact.borrow().as_slice(), &["2".to_string()]);
}

/// Skip beats every other subscription on the same subtree.
#[test]
fn skip_takes_precedence() {
    let mut ep = EventParser::new();
    ep.skip(&["secret"]).unwrap();
    let (values, v_push) = sink::<String>();
    let (deltas, d_push) = sink::<String>();
    ep.on("secret", move |v| v_push.borrow_mut().push(v.to_json_string()))
        .unwrap();
    ep.on_delta("secret", move |d| d_push.borrow_mut().push(d.chars.to_string()))
        .unwrap();

    for piece in br#"{"secret":"hidden","open":1}"#.chunks(4) {
        ep.feed(piece);
    }
    assert!(values.borrow().is_empty());
    assert!(deltas.borrow().is_empty());
}

/// The seeker strips scaffolding even when markers split across chunks.
#[test]
fn seeker_with_split_markers() {
    let mut ep = EventParser::new();
    let (texts, t_push) = sink::<String>();
    let (tools, v_push) = sink::<String>();
    ep.on_text(move |t| t_push.borrow_mut().push(t.to_string()));
    ep.on("tool", move |v| v_push.borrow_mut().push(v.to_json_string()))
        .unwrap();

    for piece in b"<think>weigh the options</think>I'll search.\n```json\n{\"tool\":\"search\"}".chunks(5) {
        ep.feed(piece);
    }

    let prose: String = texts.borrow().concat();
    assert!(prose.contains("weigh the options"));
    assert!(prose.contains("I'll search."));
    assert_eq!(tools.borrow().as_slice(), &[r#""search""#.to_string()]);
}

/// NDJSON mode: roots fire in order, subscriptions see each document.
#[test]
fn ndjson_roots_and_subscriptions() {
    let mut ep = EventParser::with_options(EventParserOptions {
        format: Format::NdJson,
        seek: false,
        ..EventParserOptions::default()
    })
    .unwrap();
    let (roots, r_push) = sink::<String>();
    let (ids, id_push) = sink::<OwnedValue>();
    ep.on_root(move |v| r_push.borrow_mut().push(v.to_json_string()));
    ep.on("id", move |v| id_push.borrow_mut().push(v.clone())).unwrap();

    for piece in b"{\"id\":1}\n{\"id\":2}\n{\"id\":3}".chunks(6) {
        ep.feed(piece);
    }
    ep.end();

    assert_eq!(
        roots.borrow().as_slice(),
        &[
            r#"{"id":1}"#.to_string(),
            r#"{"id":2}"#.to_string(),
            r#"{"id":3}"#.to_string()
        ]
    );
    assert_eq!(
        ids.borrow().as_slice(),
        &[OwnedValue::Int(1), OwnedValue::Int(2), OwnedValue::Int(3)]
    );
}

/// A string that opens and closes within one feed still produces one
/// delta (its whole content).
#[test]
fn single_feed_string_gets_one_delta() {
    let mut ep = EventParser::new();
    let (got, push) = sink::<String>();
    ep.on_delta("msg", move |d| push.borrow_mut().push(d.chars.to_string()))
        .unwrap();

    ep.feed(br#"{"msg":"all at once"}"#);
    assert_eq!(got.borrow().as_slice(), &["all at once".to_string()]);
}
