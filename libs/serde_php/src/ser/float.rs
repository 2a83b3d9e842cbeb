//! Float formatting matching PHP's `serialize_precision` semantics.
//!
//! Rust's `{:e}` formatting supplies the decimal digits, either the shortest
//! round-tripping ones or a fixed number of significant digits. These are
//! then laid out the way `printf("%G")` would, with the exponent of negative
//! two-digit powers shortened from `E-09` to `E-9`.

use std::fmt;
use std::io::Write as _;

use super::Options;

const MAX_PRECISION: usize = Options::MAX_FLOAT_PRECISION;

/// Decimal digits of a finite float, without leading or trailing zeros.
struct Digits {
    neg: bool,
    digits: Vec<u8>,
    /// Position of the decimal point relative to the first digit.
    point: i32,
}

impl Digits {
    fn new<F: fmt::LowerExp>(value: F, precision: Option<usize>) -> Self {
        let text = match precision {
            None => format!("{value:e}"),
            Some(p) => format!("{value:.*e}", p.clamp(1, MAX_PRECISION) - 1),
        };

        let (neg, text) = match text.strip_prefix('-') {
            Some(text) => (true, text),
            None => (false, text.as_str()),
        };

        let (mantissa, exp) = text.split_once('e').unwrap_or((text, "0"));
        let mut digits: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
        while digits.last() == Some(&b'0') {
            digits.pop();
        }

        let point = if digits.is_empty() {
            0
        } else {
            exp.parse::<i32>().unwrap_or(0) + 1
        };

        Self { neg, digits, point }
    }

    fn len(&self) -> i32 {
        i32::try_from(self.digits.len()).unwrap_or(i32::MAX)
    }

    fn digit(&self, index: i32) -> u8 {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.digits.get(i))
            .copied()
            .unwrap_or(b'0')
    }
}

/// Writes `value` in the textual form used by the `d:` tag.
///
/// With `precision` set, it is rounded to that many significant digits.
pub(super) fn write<F: fmt::LowerExp>(out: &mut Vec<u8>, value: F, precision: Option<usize>) {
    let d = Digits::new(value, precision);
    let nd = d.len();
    let shortest = precision.is_none();

    let mut prec = match precision {
        None => nd,
        Some(p) => i32::try_from(p.clamp(1, MAX_PRECISION)).unwrap_or(i32::MAX),
    };

    let mut eprec = prec;
    if eprec > nd && nd >= d.point {
        eprec = nd;
    }

    if shortest {
        eprec = 6;
    }

    if d.neg {
        out.push(b'-');
    }

    let exp = d.point - 1;
    if exp < -4 || exp >= eprec {
        write_exp(out, &d, prec.min(nd) - 1);
    } else {
        if prec > d.point {
            prec = nd;
        }

        write_fixed(out, &d, (prec - d.point).max(0));
    }
}

fn write_exp(out: &mut Vec<u8>, d: &Digits, prec: i32) {
    out.push(d.digit(0));
    if prec > 0 {
        out.push(b'.');
        for i in 1..=prec {
            out.push(d.digit(i));
        }
    }

    let exp = if d.digits.is_empty() { 0 } else { d.point - 1 };
    let sign = if exp < 0 { '-' } else { '+' };
    let exp = exp.unsigned_abs();

    // two digits at least, except that negative single digits lose the zero
    if sign == '-' && exp < 10 {
        _ = write!(out, "E-{exp}");
    } else {
        _ = write!(out, "E{sign}{exp:02}");
    }
}

fn write_fixed(out: &mut Vec<u8>, d: &Digits, prec: i32) {
    if d.point > 0 {
        for i in 0..d.point {
            out.push(d.digit(i));
        }
    } else {
        out.push(b'0');
    }

    if prec > 0 {
        out.push(b'.');
        for i in 1..=prec {
            out.push(d.digit(d.point + i - 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format<F: fmt::LowerExp>(value: F, precision: Option<usize>) -> String {
        let mut out = Vec::new();
        write(&mut out, value, precision);
        String::from_utf8(out).expect("float text is ascii")
    }

    #[test]
    fn shortest() {
        let cases: &[(f64, &str)] = &[
            (0.0, "0"),
            (-0.0, "-0"),
            (1.0, "1"),
            (-1.5, "-1.5"),
            (1.1, "1.1"),
            (100.0, "100"),
            (123456.0, "123456"),
            (1234567.0, "1.234567E+06"),
            (1e6, "1E+06"),
            (1e21, "1E+21"),
            (1.123456789, "1.123456789"),
            (5.2e25, "5.2E+25"),
            (85.29e-23, "8.529E-22"),
            (9e-9, "9E-9"),
            (0.0001, "0.0001"),
            (0.00001, "1E-5"),
            (1e-100, "1E-100"),
        ];

        for &(value, expected) in cases {
            assert_eq!(format(value, None), expected, "formatting {value:?}");
        }
    }

    #[test]
    fn shortest_f32() {
        assert_eq!(format(1.1f32, None), "1.1", "f32 keeps its own shortest form");
        assert_eq!(format(16777216f32, None), "1.6777216E+07", "large f32");
    }

    #[test]
    fn fixed_precision() {
        let cases: &[(f64, &str)] = &[
            (0.0, "0"),
            (1.0, "1"),
            (100.0, "100"),
            (5.2e25, "51999999999999996980101120"),
            (
                9e-9,
                "8.9999999999999995265585574287341141808127531476202420890331268310546875E-9",
            ),
            (
                1.123456789,
                "1.123456789000000011213842299184761941432952880859375",
            ),
            (
                85.29e-23,
                "8.529000000000000015048907821909675090775407218185526836754222629322086390857293736189603805541992188E-22",
            ),
            (1.1, "1.100000000000000088817841970012523233890533447265625"),
        ];

        for &(value, expected) in cases {
            assert_eq!(format(value, Some(100)), expected, "formatting {value:?}");
        }
    }

    #[test]
    fn low_precision() {
        assert_eq!(format(1.125, Some(2)), "1.1", "rounds to two digits");
        assert_eq!(format(123456.0, Some(3)), "1.23E+05", "switches to exponent");
        assert_eq!(format(0.5, Some(17)), "0.5", "drops trailing zeros");
    }

    #[test]
    fn precision_beyond_exact() {
        assert_eq!(format(1.5, Some(usize::MAX)), "1.5");
        assert_eq!(format(0.1, Some(100_000)), format(0.1, Some(MAX_PRECISION)));
    }
}
