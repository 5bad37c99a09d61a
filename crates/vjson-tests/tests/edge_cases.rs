//! Boundary behaviors: vector-width alignment, escapes and surrogates
//! across window and chunk boundaries, the depth ceiling, and very wide
//! objects.

use vjson_classify::ErrorKind;
use vjson_core::{ParserOptions, ParserStatus, StreamParser, parse};
use vjson_tests::{feed_chunked, live_canonical, oneshot_canonical};

/// A string whose content is exactly the SIMD window width (64 bytes),
/// and the off-by-one cases around it.
#[test]
fn string_at_window_width() {
    for content_len in [63usize, 64, 65, 127, 128, 129] {
        let content = "x".repeat(content_len);
        let doc = format!(r#"{{"s":"{content}"}}"#);
        let parsed = parse(doc.as_bytes());
        assert_eq!(parsed.status(), ParserStatus::Complete, "len {content_len}");
        let value = parsed.value().unwrap();
        assert_eq!(
            value.get("s").unwrap().as_str().unwrap().len(),
            content_len,
            "len {content_len}"
        );
    }
}

/// The only escape in the string falls exactly across the 64-byte
/// window boundary.
#[test]
fn escape_across_window_boundary() {
    for pad in 55..70 {
        let mut doc = String::from("{\"k\":\"");
        doc.push_str(&"a".repeat(pad));
        doc.push_str("\\n");
        doc.push_str("b\"}");
        let parsed = parse(doc.as_bytes());
        assert_eq!(parsed.status(), ParserStatus::Complete, "pad {pad}");
        let expected = format!("{}\nb", "a".repeat(pad));
        assert_eq!(
            parsed.value().unwrap().get("k").unwrap().as_str().unwrap(),
            expected,
            "pad {pad}"
        );
    }
}

/// A number whose last digit ends one feed while `.` or `e` opens the
/// next.
#[test]
fn number_grows_across_feeds() {
    let mut p = StreamParser::new();
    p.feed(b"[12");
    assert_eq!(live_canonical(&p), "[12]");
    p.feed(b".5");
    assert_eq!(live_canonical(&p), "[12.5]");
    p.feed(b"e2]");
    assert_eq!(p.status(), ParserStatus::Complete);
    assert_eq!(live_canonical(&p), "[1250.0]");
}

/// Surrogate pair split across a chunk boundary at every byte.
#[test]
fn surrogate_pair_split_everywhere() {
    let doc = "{\"emoji\":\"\u{1F600}!\"}".as_bytes();
    let whole = oneshot_canonical(doc);
    for k in 1..doc.len() {
        let mut p = StreamParser::new();
        p.feed(&doc[..k]);
        p.feed(&doc[k..]);
        assert_eq!(p.status(), ParserStatus::Complete, "split {k}");
        assert_eq!(live_canonical(&p), whole, "split {k}");
    }
}

/// Partial atoms at the root and inside containers.
#[test]
fn partial_atoms() {
    for (input, completed) in [
        (&b"t"[..], "true"),
        (b"tru", "true"),
        (b"fals", "false"),
        (b"nul", "null"),
        (b"[t", "[true]"),
        (b"{\"flag\":tru", "{\"flag\":true}"),
        (b"[null,fals", "[null,false]"),
    ] {
        let parsed = parse(input);
        assert_eq!(parsed.status(), ParserStatus::Incomplete, "input {input:?}");
        assert_eq!(
            parsed.materialize().unwrap().to_json_string(),
            completed,
            "input {input:?}"
        );
        assert!(!parsed.value().unwrap().is_complete());
    }
}

/// Depth exactly at the ceiling parses; one deeper errors.
#[test]
fn depth_at_and_past_the_ceiling() {
    let limit = 256;
    let at_limit: Vec<u8> = std::iter::repeat_n(b'[', limit)
        .chain(std::iter::repeat_n(b']', limit))
        .collect();
    let parsed = parse(&at_limit);
    assert_eq!(parsed.status(), ParserStatus::Complete);

    let past: Vec<u8> = std::iter::repeat_n(b'[', limit + 1).collect();
    let parsed = parse(&past);
    assert_eq!(parsed.status(), ParserStatus::Error);
    assert_eq!(parsed.error().unwrap().kind, ErrorKind::DepthExceeded);
}

/// A configurable ceiling is honoured too.
#[test]
fn custom_depth_ceiling() {
    let mut p = StreamParser::with_options(ParserOptions {
        depth_limit: 4,
        ..ParserOptions::default()
    });
    assert_eq!(p.feed(b"[[[[1]]]]"), ParserStatus::Complete);

    let mut p = StreamParser::with_options(ParserOptions {
        depth_limit: 4,
        ..ParserOptions::default()
    });
    assert_eq!(p.feed(b"[[[[[1]]]]]"), ParserStatus::Error);
}

/// An object of 16 384 keys: counts stay exact, keyed access works, and
/// the whole thing survives small-chunk feeding.
#[test]
fn very_wide_object() {
    let mut doc = Vec::from(&b"{"[..]);
    for i in 0..16_384 {
        if i > 0 {
            doc.push(b',');
        }
        doc.extend_from_slice(format!("\"k{i}\":{i}").as_bytes());
    }
    doc.push(b'}');

    let parsed = parse(&doc);
    assert_eq!(parsed.status(), ParserStatus::Complete);
    let root = parsed.value().unwrap();
    assert_eq!(root.len(), Some(16_384));
    for i in [0usize, 1, 8_191, 16_383] {
        assert_eq!(
            root.get(&format!("k{i}")).unwrap().as_i64(),
            Some(i as i64),
            "k{i}"
        );
    }

    // And chunked: the committed prefix must never be re-walked, so
    // this also guards against accidental O(n²) behavior.
    let p = feed_chunked(&doc, 1024);
    assert_eq!(p.status(), ParserStatus::Complete);
    assert_eq!(
        p.value().unwrap().unwrap().len(),
        Some(16_384)
    );
}

/// Whitespace-heavy input around every structural character.
#[test]
fn whitespace_everywhere() {
    let doc = b" { \"a\" : [ 1 , 2 ] , \"b\" : { } } ";
    let parsed = parse(doc);
    assert_eq!(parsed.status(), ParserStatus::Complete);
    assert_eq!(
        parsed.materialize().unwrap().to_json_string(),
        r#"{"a":[1,2],"b":{}}"#
    );
}

/// Empty containers materialize exactly once closed.
#[test]
fn empty_containers() {
    assert_eq!(oneshot_canonical(b"{}"), "{}");
    assert_eq!(oneshot_canonical(b"[]"), "[]");
    assert_eq!(oneshot_canonical(b"[{},[],{}]"), "[{},[],{}]");
}
