//! Town and weather cursors

/// Index after `current` in a table of `len` entries, wrapping around
pub fn next_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (current + 1) % len
    }
}

/// Position in a fixed enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    index: usize,
    len: usize,
}

impl Cursor {
    /// Start index is wrapped into range
    pub fn new(start: usize, len: usize) -> Self {
        Self {
            index: if len == 0 { 0 } else { start % len },
            len,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Move to `index`, wrapped into range
    pub fn set(&mut self, index: usize) {
        *self = Self::new(index, self.len);
    }

    /// Step forward once and return the new index
    pub fn advance(&mut self) -> usize {
        self.index = next_index(self.index, self.len);
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_index_wraps() {
        assert_eq!(next_index(0, 5), 1);
        assert_eq!(next_index(4, 5), 0);
        assert_eq!(next_index(0, 1), 0);
        assert_eq!(next_index(3, 0), 0);
    }

    #[test]
    fn test_two_advances_from_one() {
        let mut cursor = Cursor::new(1, 5);
        cursor.advance();
        assert_eq!(cursor.advance(), 3);
    }

    #[test]
    fn test_start_out_of_range_wraps() {
        assert_eq!(Cursor::new(7, 5).index(), 2);
    }
}
