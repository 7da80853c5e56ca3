use thiserror::Error;

const RADIX: u64 = 36;
const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty base-36 value")]
    Empty,
    #[error("invalid base-36 digit {digit:?} in {value:?}")]
    InvalidDigit { value: String, digit: char },
    #[error("base-36 value {0:?} does not fit in 64 bits")]
    Overflow(String),
}

/// base-36 encoding, most significant digit first
///
/// ```
/// use liab_pack::codec::encode;
///
/// assert_eq!(encode(0), "0");
/// assert_eq!(encode(35), "Z");
/// assert_eq!(encode(36), "10");
/// ```
pub fn encode(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(DIGITS[(n % RADIX) as usize]);
        n /= RADIX;
    }
    digits.reverse();

    // INFO: every byte comes from DIGITS
    digits.into_iter().map(char::from).collect()
}

/// inverse of [`encode`], only `0-9A-Z` are accepted
pub fn decode(value: &str) -> Result<u64, DecodeError> {
    if value.is_empty() {
        return Err(DecodeError::Empty);
    }

    value.chars().try_fold(0u64, |acc, digit| {
        let d = match digit {
            '0'..='9' => digit as u64 - '0' as u64,
            'A'..='Z' => digit as u64 - 'A' as u64 + 10,
            _ => {
                return Err(DecodeError::InvalidDigit {
                    value: value.to_string(),
                    digit,
                })
            }
        };

        acc.checked_mul(RADIX)
            .and_then(|acc| acc.checked_add(d))
            .ok_or_else(|| DecodeError::Overflow(value.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode(0), "0");
        assert_eq!(encode(10), "A");
        assert_eq!(encode(71), "1Z");
        assert_eq!(encode(1295), "ZZ");
        assert_eq!(encode(1296), "100");
    }

    #[test]
    fn test_decode_inverts_encode() {
        for n in (0..5000).chain([u32::MAX as u64, u64::MAX]) {
            assert_eq!(decode(&encode(n)), Ok(n));
        }
    }

    #[test]
    fn test_decode_rejects_foreign_digits() {
        assert_eq!(
            decode("1x"),
            Err(DecodeError::InvalidDigit {
                value: "1x".to_string(),
                digit: 'x'
            })
        );
        assert!(decode("-1").is_err());
        assert_eq!(decode(""), Err(DecodeError::Empty));
    }

    #[test]
    fn test_decode_overflow() {
        assert!(matches!(
            decode("ZZZZZZZZZZZZZZZZ"),
            Err(DecodeError::Overflow(_))
        ));
    }
}
