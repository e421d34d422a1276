//! Integer and byte conversions shared by the codecs

use num_bigint::BigUint;

use crate::error::{RuntimeError, RuntimeResult};

/// Strip trailing zero bytes
pub fn trim_trailing_zeros(bytes: &[u8]) -> Vec<u8> {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    bytes[..end].to_vec()
}

/// Minimal little-endian segment of an integer (zero is the empty segment)
pub fn bigint_to_value(x: &BigUint) -> Vec<u8> {
    trim_trailing_zeros(&x.to_bytes_le())
}

/// Integer from a little-endian segment
pub fn value_to_bigint(segment: &[u8]) -> BigUint {
    BigUint::from_bytes_le(segment)
}

/// Pad a byte segment with zeros up to `n` bytes
pub fn pad_to(n: usize, segment: &[u8], what: &str) -> RuntimeResult<Vec<u8>> {
    if segment.len() > n {
        return Err(RuntimeError::out_of_range(format!(
            "expected {what} of at most {n} bytes, received {}",
            segment.len()
        )));
    }
    let mut out = segment.to_vec();
    out.resize(n, 0);
    Ok(out)
}
