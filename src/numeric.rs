//! Integer parsing for numeric option arguments.
//!
//! Follows the C `strtol(arg, &end, 0)` conventions the tool has always
//! accepted: leading whitespace and an optional sign are skipped, the base is
//! picked from the prefix (`0x`/`0X` hex, a leading `0` octal, decimal
//! otherwise) and parsing stops at the first character that is not a digit
//! in that base. Anything after the digits is ignored.

/// Why a numeric argument was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericError {
    /// Not a single digit could be consumed.
    NoDigits,
    /// The digits do not fit in an `i64`.
    Overflow,
}

pub fn parse_int(arg: &str) -> Result<i64, NumericError> {
    let bytes = arg.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }

    let negative = match bytes.get(pos) {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let radix = if bytes.get(pos) == Some(&b'0') {
        // "0x" with no hex digit after it parses as a plain 0.
        match (bytes.get(pos + 1), bytes.get(pos + 2)) {
            (Some(b'x' | b'X'), Some(c)) if c.is_ascii_hexdigit() => {
                pos += 2;
                16
            }
            _ => 8,
        }
    } else {
        10
    };

    let mut magnitude: u64 = 0;
    let mut digits = 0;
    let mut overflow = false;
    while let Some(digit) = bytes.get(pos).and_then(|c| (*c as char).to_digit(radix)) {
        match magnitude
            .checked_mul(u64::from(radix))
            .and_then(|m| m.checked_add(u64::from(digit)))
        {
            Some(m) => magnitude = m,
            None => overflow = true,
        }
        digits += 1;
        pos += 1;
    }

    if digits == 0 {
        return Err(NumericError::NoDigits);
    }
    if overflow {
        return Err(NumericError::Overflow);
    }

    if negative {
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(NumericError::Overflow);
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| NumericError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal() {
        assert_eq!(parse_int("1024"), Ok(1024));
        assert_eq!(parse_int("+7"), Ok(7));
        assert_eq!(parse_int("-15"), Ok(-15));
        assert_eq!(parse_int("  42"), Ok(42));
    }

    #[test]
    fn test_hex_and_octal() {
        assert_eq!(parse_int("0x400"), Ok(1024));
        assert_eq!(parse_int("0XfF"), Ok(255));
        assert_eq!(parse_int("-0x10"), Ok(-16));
        assert_eq!(parse_int("0755"), Ok(493));
        assert_eq!(parse_int("0"), Ok(0));
    }

    #[test]
    fn test_stops_at_first_invalid_digit() {
        assert_eq!(parse_int("12abc"), Ok(12));
        assert_eq!(parse_int("08"), Ok(0));
        assert_eq!(parse_int("0x"), Ok(0));
        assert_eq!(parse_int("0xg1"), Ok(0));
        assert_eq!(parse_int("10 20"), Ok(10));
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(parse_int(""), Err(NumericError::NoDigits));
        assert_eq!(parse_int("abc"), Err(NumericError::NoDigits));
        assert_eq!(parse_int("-"), Err(NumericError::NoDigits));
        assert_eq!(parse_int("   "), Err(NumericError::NoDigits));
        assert_eq!(parse_int("+-1"), Err(NumericError::NoDigits));
    }

    #[test]
    fn test_overflow() {
        assert_eq!(parse_int("9223372036854775807"), Ok(i64::MAX));
        assert_eq!(parse_int("-9223372036854775808"), Ok(i64::MIN));
        assert_eq!(
            parse_int("9223372036854775808"),
            Err(NumericError::Overflow)
        );
        assert_eq!(
            parse_int("-9223372036854775809"),
            Err(NumericError::Overflow)
        );
        assert_eq!(
            parse_int("0xffffffffffffffffff"),
            Err(NumericError::Overflow)
        );
    }
}
