use crate::error::{RuntimeError, RuntimeResult};
use crate::types::Value;

/// Cursor over the segments of a [`Value`]
///
/// Decoders shift segments off the front; successive decoders sharing one
/// reader pick up where the previous one stopped.
#[derive(Debug, Clone, Copy)]
pub struct ValueReader<'a> {
    segments: &'a [Vec<u8>],
    offset: usize,
}

impl<'a> ValueReader<'a> {
    /// Creates a new cursor over the provided value.
    pub fn new(value: &'a Value) -> Self {
        Self::from_segments(&value.0)
    }

    /// Creates a cursor over raw segments.
    pub fn from_segments(segments: &'a [Vec<u8>]) -> Self {
        Self {
            segments,
            offset: 0,
        }
    }

    /// Returns the number of segments consumed so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Returns the number of segments remaining.
    pub fn remaining(&self) -> usize {
        self.segments.len().saturating_sub(self.offset)
    }

    /// Removes and returns the next segment.
    pub fn shift(&mut self, expected: &str) -> RuntimeResult<&'a [u8]> {
        let segment = self.segments.get(self.offset).ok_or_else(|| {
            RuntimeError::type_mismatch(format!(
                "value ended after {} segments while decoding {expected}",
                self.offset
            ))
        })?;
        self.offset += 1;
        Ok(segment)
    }

    /// Errors if any segment was left unread.
    pub fn ensure_consumed(&self) -> RuntimeResult<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(RuntimeError::type_mismatch(format!(
                "{remaining} trailing segments after {} decoded",
                self.offset
            ))),
        }
    }
}

impl<'a> From<&'a Value> for ValueReader<'a> {
    fn from(value: &'a Value) -> Self {
        ValueReader::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_consumes_in_order() {
        let value = Value(vec![vec![1], vec![], vec![2, 3]]);
        let mut reader = ValueReader::new(&value);
        assert_eq!(reader.shift("a").unwrap(), &[1]);
        assert_eq!(reader.shift("b").unwrap(), &[] as &[u8]);
        assert_eq!(reader.remaining(), 1);
        assert!(reader.ensure_consumed().is_err());
        assert_eq!(reader.shift("c").unwrap(), &[2, 3]);
        assert!(reader.ensure_consumed().is_ok());
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_shift_past_end_errors() {
        let value = Value::default();
        let mut reader = ValueReader::new(&value);
        let err = reader.shift("Boolean").unwrap_err();
        assert!(err.message().contains("Boolean"));
    }
}
