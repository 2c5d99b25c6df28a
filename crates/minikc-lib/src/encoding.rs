//! DNA base codes.
//!
//! The engine works on 2-bit base codes ordered lexicographically:
//! A -> 0, C -> 1, G -> 2, T -> 3. With this mapping the unsigned integer
//! order of packed values equals the lexicographic order of the underlying
//! DNA strings, which is what the minimizer comparison relies on.

use thiserror::Error;

/// Error type for base-code conversions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a valid DNA base (A/C/G/T)
    #[error("invalid DNA base {base:?} at position {position}")]
    InvalidBase {
        /// The offending input byte
        base: u8,
        /// Position within the input sequence
        position: usize,
    },
    /// The input string length does not match the expected k-mer length
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },
}

/// Encode a single DNA nucleotide to its 2-bit code
#[inline]
pub const fn encode_base(base: u8) -> Option<u8> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Decode a 2-bit code back to an uppercase nucleotide
#[inline]
pub const fn decode_base(code: u8) -> u8 {
    match code & 0b11 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

/// Complement of a base code (A<->T, C<->G)
#[inline]
pub const fn complement_base(code: u8) -> u8 {
    code ^ 0b11
}

/// Whether `code` is a valid 2-bit base code
#[inline]
pub const fn is_valid_code(code: u8) -> bool {
    code <= 3
}

/// Encode an ASCII DNA sequence into base codes
///
/// # Errors
/// Returns [`EncodingError::InvalidBase`] for the first byte outside A/C/G/T.
pub fn encode_bases(sequence: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut codes = Vec::with_capacity(sequence.len());
    for (position, &base) in sequence.iter().enumerate() {
        match encode_base(base) {
            Some(code) => codes.push(code),
            None => return Err(EncodingError::InvalidBase { base, position }),
        }
    }
    Ok(codes)
}

/// Decode base codes back into an ASCII string
pub fn decode_bases(codes: &[u8]) -> String {
    codes.iter().map(|&c| decode_base(c) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_base() {
        assert_eq!(encode_base(b'A'), Some(0));
        assert_eq!(encode_base(b'c'), Some(1));
        assert_eq!(encode_base(b'G'), Some(2));
        assert_eq!(encode_base(b't'), Some(3));
        assert_eq!(encode_base(b'N'), None);
        assert_eq!(encode_base(b'X'), None);
    }

    #[test]
    fn test_code_order_is_lexicographic() {
        // A < C < G < T must hold on the codes
        let codes: Vec<u8> = b"ACGT".iter().map(|&b| encode_base(b).unwrap()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_complement() {
        assert_eq!(complement_base(0), 3); // A -> T
        assert_eq!(complement_base(3), 0); // T -> A
        assert_eq!(complement_base(1), 2); // C -> G
        assert_eq!(complement_base(2), 1); // G -> C
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for seq in ["ACGT", "AAAA", "TTTT", "GATTACA"] {
            let codes = encode_bases(seq.as_bytes()).unwrap();
            assert_eq!(decode_bases(&codes), seq);
        }
    }

    #[test]
    fn test_encode_invalid_reports_position() {
        let err = encode_bases(b"ACGNT").unwrap_err();
        assert_eq!(
            err,
            EncodingError::InvalidBase {
                base: b'N',
                position: 3
            }
        );
    }
}
