//! Upload byte buffer with fallible, exact reservation

use alloc::vec::Vec;

/// Bytes of one upload, capacity fixed to the declared length
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadBuffer {
    bytes: Vec<u8>,
}

impl UploadBuffer {
    /// Reserve exactly `capacity` bytes; `None` if the heap cannot supply them
    pub fn try_with_capacity(capacity: usize) -> Option<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(capacity).ok()?;
        Some(Self { bytes })
    }

    /// Append without growing; `false` (and nothing copied) if it would not fit
    pub fn append(&mut self, data: &[u8]) -> bool {
        if data.len() > self.bytes.capacity() - self.bytes.len() {
            return false;
        }
        self.bytes.extend_from_slice(data);
        true
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_within_capacity() {
        let mut buf = UploadBuffer::try_with_capacity(4).unwrap();
        assert!(buf.append(&[1, 2]));
        assert!(buf.append(&[3, 4]));
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_append_overflow_copies_nothing() {
        let mut buf = UploadBuffer::try_with_capacity(3).unwrap();
        assert!(buf.append(&[1, 2]));
        let cap = buf.capacity();
        let extra = alloc::vec![0u8; cap - 1];
        assert!(!buf.append(&extra));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_absurd_reservation_fails() {
        assert!(UploadBuffer::try_with_capacity(usize::MAX).is_none());
    }
}
