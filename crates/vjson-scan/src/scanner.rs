//! The cross-feed structural scanner.

use crate::block::classify_block;
use crate::mask::{find_escaped, prefix_xor};

/// Window size in bytes. Masks are 64-bit, one bit per byte.
pub const BLOCK_SIZE: usize = 64;

/// Required owned padding past the logical input length. Vector loads of
/// the final partial window read into this region; it must be zeroed so
/// pad bytes never classify as structural.
pub const PAD_SIZE: usize = 64;

/// Incremental structural scanner.
///
/// The scanner walks an append-only buffer in 64-byte windows and reports
/// the offsets of unescaped structural characters outside string
/// interiors. Two carries make strings and escapes that span windows (and
/// feeds) work without re-scanning committed bytes:
///
/// - `in_string` — quote parity at the last aligned window boundary;
/// - `pending_escape` — whether the previous window ended in an odd
///   backslash run, escaping the next byte.
///
/// Carries are persisted only at *full* window boundaries at or below the
/// logical length. The trailing partial window is scanned against the
/// zeroed pad and re-scanned on the next call once real bytes fill it in;
/// `emitted_upto` suppresses the duplicate offsets that re-scan would
/// otherwise report.
#[derive(Clone, Debug)]
pub struct Scanner {
    /// Last 64-aligned offset for which `in_string`/`pending_escape` hold.
    aligned: usize,
    /// Offsets below this have already been reported.
    emitted_upto: usize,
    in_string: bool,
    pending_escape: bool,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            aligned: 0,
            emitted_upto: 0,
            in_string: false,
            pending_escape: false,
        }
    }

    /// Forget all progress; the next `scan` starts from offset 0.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Scan all bytes up to `len`, appending newly discovered structural
    /// offsets (ascending) to `out`.
    ///
    /// `buf` must hold at least `len + PAD_SIZE` bytes, and `buf[len..]`
    /// must be zeroed — the final partial window is loaded whole.
    ///
    /// # Panics
    ///
    /// Panics if `buf.len() < len + PAD_SIZE`.
    pub fn scan(&mut self, buf: &[u8], len: usize, out: &mut Vec<u32>) {
        assert!(
            buf.len() >= len + PAD_SIZE,
            "scan buffer must carry {PAD_SIZE} pad bytes past the logical length"
        );

        let mut pos = self.aligned;
        let mut in_string = self.in_string;
        let mut pending_escape = self.pending_escape;

        while pos < len {
            let block: &[u8; BLOCK_SIZE] = buf[pos..pos + BLOCK_SIZE]
                .try_into()
                .expect("window slice is exactly BLOCK_SIZE bytes");
            let masks = classify_block(block);

            let (escaped, escape_carry) = find_escaped(masks.backslash, pending_escape);
            let quote = masks.quote & !escaped;
            let string_mask =
                prefix_xor(quote) ^ (if in_string { u64::MAX } else { 0 });

            // Structural characters strictly inside a string are elided;
            // the boundary quotes themselves are always reported.
            let mut emit = (masks.structural & !string_mask) | quote;
            while emit != 0 {
                let offset = pos + emit.trailing_zeros() as usize;
                if offset >= self.emitted_upto && offset < len {
                    out.push(offset as u32);
                }
                emit &= emit - 1;
            }

            if pos + BLOCK_SIZE <= len {
                // Full window: persist carries and advance.
                in_string = string_mask >> 63 != 0;
                pending_escape = escape_carry;
                pos += BLOCK_SIZE;
                self.aligned = pos;
                self.in_string = in_string;
                self.pending_escape = pending_escape;
            } else {
                // Partial window: scanned against the pad, carries stay at
                // the aligned boundary so the next feed re-scans it with
                // the real bytes.
                break;
            }
        }

        self.emitted_upto = len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scan a full input in one call, returning the structural offsets.
    fn scan_all(input: &[u8]) -> Vec<u32> {
        let mut buf = input.to_vec();
        buf.resize(input.len() + PAD_SIZE, 0);
        let mut scanner = Scanner::new();
        let mut out = Vec::new();
        scanner.scan(&buf, input.len(), &mut out);
        out
    }

    /// Scan the same input byte-by-byte across feeds.
    fn scan_chunked(input: &[u8], chunk: usize) -> Vec<u32> {
        let mut scanner = Scanner::new();
        let mut out = Vec::new();
        let mut buf = Vec::new();
        let mut len = 0;
        for piece in input.chunks(chunk) {
            buf.truncate(len);
            buf.extend_from_slice(piece);
            len += piece.len();
            buf.resize(len + PAD_SIZE, 0);
            scanner.scan(&buf, len, &mut out);
        }
        out
    }

    #[test]
    fn simple_object() {
        let offsets = scan_all(br#"{"a":1}"#);
        // { " " : }
        assert_eq!(offsets, vec![0, 1, 3, 4, 6]);
    }

    #[test]
    fn structural_inside_string_elided() {
        let offsets = scan_all(br#"["a,b:c{}"]"#);
        // [ " " ]
        assert_eq!(offsets, vec![0, 1, 9, 10]);
    }

    #[test]
    fn escaped_quote_not_a_boundary() {
        let offsets = scan_all(br#"{"a\"b":1}"#);
        // { " (open at 1) " (close at 6) : }
        assert_eq!(offsets, vec![0, 1, 6, 7, 9]);
    }

    #[test]
    fn double_backslash_then_close() {
        let offsets = scan_all(br#"{"a\\":1}"#);
        assert_eq!(offsets, vec![0, 1, 5, 6, 8]);
    }

    #[test]
    fn string_spanning_window_boundary() {
        // Open a string before offset 64 and close it after
        let mut input = Vec::new();
        input.extend_from_slice(b"[\"");
        input.extend_from_slice(&[b'x'; 70]);
        input.extend_from_slice(b"\",1]");
        let offsets = scan_all(&input);
        // [ at 0, open quote at 1, close quote at 72, comma at 73, ] at 75
        assert_eq!(offsets, vec![0, 1, 72, 73, 75]);
    }

    #[test]
    fn escape_straddling_window_boundary() {
        // Backslash at byte 63 escapes the quote at byte 64
        let mut input = vec![b'['; 1];
        input.push(b'"');
        input.extend_from_slice(&[b'a'; 61]); // bytes 2..=62
        input.push(b'\\'); // byte 63
        input.push(b'"'); // byte 64 — escaped, still inside the string
        input.extend_from_slice(b"\"]"); // real close at 65, ] at 66
        let offsets = scan_all(&input);
        assert_eq!(offsets, vec![0, 1, 65, 66]);
    }

    #[test]
    fn chunked_scan_matches_whole_scan() {
        let input = br#"{"name":"Ali\"ce","items":[1,2,{"k":"v"}],"done":true}"#;
        let whole = scan_all(input);
        for chunk in [1, 2, 3, 7, 16, 64] {
            assert_eq!(scan_chunked(input, chunk), whole, "chunk size {chunk}");
        }
    }

    #[test]
    fn chunked_scan_across_many_windows() {
        let mut input = Vec::from(&b"{\"code\":\""[..]);
        for _ in 0..40 {
            input.extend_from_slice(b"let x = 1; ");
        }
        input.extend_from_slice(b"\",\"n\":-2.5e3}");
        let whole = scan_all(&input);
        for chunk in [5, 8, 32, 63, 64, 65] {
            assert_eq!(scan_chunked(&input, chunk), whole, "chunk size {chunk}");
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(scan_all(b"").is_empty());
    }

    #[test]
    fn unterminated_string_reports_open_quote_only() {
        let offsets = scan_all(br#"{"msg":"Hel"#);
        assert_eq!(offsets, vec![0, 1, 5, 6, 7]);
    }

    #[test]
    fn reset_restarts_from_zero() {
        let input = br#"{"a":1}"#;
        let mut buf = input.to_vec();
        buf.resize(input.len() + PAD_SIZE, 0);

        let mut scanner = Scanner::new();
        let mut out = Vec::new();
        scanner.scan(&buf, input.len(), &mut out);
        scanner.reset();
        let mut again = Vec::new();
        scanner.scan(&buf, input.len(), &mut again);
        assert_eq!(out, again);
    }
}
