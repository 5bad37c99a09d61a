//! Number literal parsing.
//!
//! Tagging rules: a decimal integer without fraction or exponent that
//! fits `i64` is tagged signed; one that only fits `u64` unsigned; any
//! other form (fraction, exponent, overflow) becomes a 64-bit double.
//!
//! Doubles take an exact fast path when the mantissa and scale are small
//! enough that every intermediate is representable; everything else
//! defers to the standard library's correctly-rounded parser (which
//! performs the big-decimal refinement at the precision edge, giving
//! round-to-nearest-even).

use vjson_classify::{ErrorKind, ParseError};

use crate::token::TokenKind;

/// Exactly representable powers of ten: 10^0 ..= 10^22.
const POW10: [f64; 23] = [
  1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
  1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// Mantissa digit count safe for the exact fast path (10^15 < 2^53).
const FAST_PATH_DIGITS: usize = 15;

/// Parse one complete number literal.
///
/// `offset` is the literal's absolute source position, used for error
/// reporting only.
///
/// # Errors
///
/// [`ErrorKind::InvalidNumberLiteral`] for any grammar violation: no
/// digits, leading zero, dangling `.`/`e`/sign, trailing garbage.
pub fn parse_number(literal: &[u8], offset: usize) -> Result<TokenKind, ParseError> {
  let err = || ParseError::new(ErrorKind::InvalidNumberLiteral, offset);

  let neg = literal.first() == Some(&b'-');
  let mut i = usize::from(neg);

  let int_start = i;
  while i < literal.len() && literal[i].is_ascii_digit() {
    i += 1;
  }
  let int_digits = &literal[int_start..i];
  if int_digits.is_empty() {
    return Err(err());
  }
  if int_digits.len() > 1 && int_digits[0] == b'0' {
    return Err(err());
  }

  let mut frac_digits: &[u8] = &[];
  if i < literal.len() && literal[i] == b'.' {
    i += 1;
    let frac_start = i;
    while i < literal.len() && literal[i].is_ascii_digit() {
      i += 1;
    }
    frac_digits = &literal[frac_start..i];
    if frac_digits.is_empty() {
      return Err(err());
    }
  }

  let mut exp: i64 = 0;
  let mut has_exp = false;
  if i < literal.len() && (literal[i] == b'e' || literal[i] == b'E') {
    has_exp = true;
    i += 1;
    let exp_neg = match literal.get(i) {
      Some(b'+') => {
        i += 1;
        false
      }
      Some(b'-') => {
        i += 1;
        true
      }
      _ => false,
    };
    let exp_start = i;
    while i < literal.len() && literal[i].is_ascii_digit() {
      // Saturate: anything beyond ±1000 is already infinity or zero.
      exp = (exp * 10 + i64::from(literal[i] - b'0')).min(10_000);
      i += 1;
    }
    if i == exp_start {
      return Err(err());
    }
    if exp_neg {
      exp = -exp;
    }
  }

  if i != literal.len() {
    return Err(err());
  }

  // Integer path.
  if frac_digits.is_empty() && !has_exp {
    if let Some(magnitude) = accumulate_u64(int_digits) {
      if neg {
        // i64::MIN's magnitude is i64::MAX + 1.
        if magnitude <= i64::MAX as u64 + 1 {
          return Ok(TokenKind::Int((magnitude as i64).wrapping_neg()));
        }
      } else if magnitude <= i64::MAX as u64 {
        return Ok(TokenKind::Int(magnitude as i64));
      } else {
        return Ok(TokenKind::Uint(magnitude));
      }
    }
    // Overflows 64 bits: fall through to the double path.
  }

  // Double fast path: small mantissa, small scale — every step exact.
  let digits = int_digits.len() + frac_digits.len();
  let scale = exp - frac_digits.len() as i64;
  if digits <= FAST_PATH_DIGITS && scale.unsigned_abs() <= 22 {
    let mantissa = accumulate_u64(int_digits)
      .and_then(|acc| frac_digits.iter().try_fold(acc, |acc, &d| {
        acc
          .checked_mul(10)
          .and_then(|acc| acc.checked_add(u64::from(d - b'0')))
      }))
      .expect("15 digits cannot overflow u64");
    let mut value = mantissa as f64;
    if scale >= 0 {
      value *= POW10[scale as usize];
    } else {
      value /= POW10[scale.unsigned_abs() as usize];
    }
    if neg {
      value = -value;
    }
    return Ok(TokenKind::Double(value));
  }

  // Precision edge: delegate to the correctly-rounded library parser.
  let text = std::str::from_utf8(literal).map_err(|_| err())?;
  let value: f64 = text.parse().map_err(|_| err())?;
  Ok(TokenKind::Double(value))
}

fn accumulate_u64(digits: &[u8]) -> Option<u64> {
  digits.iter().try_fold(0u64, |acc, &d| {
    acc
      .checked_mul(10)
      .and_then(|acc| acc.checked_add(u64::from(d - b'0')))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(literal: &[u8]) -> TokenKind {
    parse_number(literal, 0).unwrap()
  }

  fn parse_err(literal: &[u8]) {
    assert!(
      parse_number(literal, 7).is_err(),
      "expected error for {:?}",
      String::from_utf8_lossy(literal)
    );
  }

  #[test]
  fn small_integers_are_signed() {
    assert_eq!(parse(b"0"), TokenKind::Int(0));
    assert_eq!(parse(b"42"), TokenKind::Int(42));
    assert_eq!(parse(b"-42"), TokenKind::Int(-42));
    assert_eq!(parse(b"-0"), TokenKind::Int(0));
  }

  #[test]
  fn i64_boundaries() {
    assert_eq!(parse(b"9223372036854775807"), TokenKind::Int(i64::MAX));
    assert_eq!(parse(b"-9223372036854775808"), TokenKind::Int(i64::MIN));
  }

  #[test]
  fn u64_range_is_unsigned() {
    assert_eq!(
      parse(b"9223372036854775808"),
      TokenKind::Uint(9_223_372_036_854_775_808)
    );
    assert_eq!(parse(b"18446744073709551615"), TokenKind::Uint(u64::MAX));
  }

  #[test]
  fn past_u64_becomes_double() {
    assert_eq!(
      parse(b"18446744073709551616"),
      TokenKind::Double(18_446_744_073_709_551_616.0)
    );
    assert_eq!(
      parse(b"-9223372036854775809"),
      TokenKind::Double(-9_223_372_036_854_775_809.0)
    );
  }

  #[test]
  fn fraction_and_exponent_are_double() {
    assert_eq!(parse(b"2.5"), TokenKind::Double(2.5));
    assert_eq!(parse(b"2.5e-3"), TokenKind::Double(2.5e-3));
    assert_eq!(parse(b"-1.25E+2"), TokenKind::Double(-125.0));
    assert_eq!(parse(b"1e3"), TokenKind::Double(1000.0));
    assert_eq!(parse(b"0.1"), TokenKind::Double(0.1));
  }

  #[test]
  fn negative_zero_double() {
    match parse(b"-0.0") {
      TokenKind::Double(d) => {
        assert_eq!(d, 0.0);
        assert!(d.is_sign_negative());
      }
      other => panic!("expected double, got {other:?}"),
    }
  }

  #[test]
  fn precision_edge_uses_refinement() {
    // 17 significant digits — outside the fast path, must still round
    // to nearest even exactly as the platform parser does.
    assert_eq!(
      parse(b"2.2250738585072014e-308"),
      TokenKind::Double(2.225_073_858_507_201_4e-308)
    );
    assert_eq!(
      parse(b"1.7976931348623157e308"),
      TokenKind::Double(f64::MAX)
    );
    assert_eq!(
      parse(b"7.2057594037927933e16"),
      TokenKind::Double(7.205_759_403_792_793_3e16)
    );
  }

  #[test]
  fn overflow_to_infinity() {
    match parse(b"1e999") {
      TokenKind::Double(d) => assert!(d.is_infinite() && d.is_sign_positive()),
      other => panic!("expected double, got {other:?}"),
    }
  }

  #[test]
  fn grammar_violations() {
    parse_err(b"");
    parse_err(b"-");
    parse_err(b"01");
    parse_err(b"1.");
    parse_err(b".5");
    parse_err(b"1e");
    parse_err(b"1e+");
    parse_err(b"1x");
    parse_err(b"--1");
  }

  #[test]
  fn error_carries_offset() {
    let err = parse_number(b"01", 33).unwrap_err();
    assert_eq!(err.offset, 33);
    assert_eq!(err.kind, ErrorKind::InvalidNumberLiteral);
  }
}
