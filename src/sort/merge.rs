//! Two-way merge
//!
//! Stable two-pointer merge over sorted slices.

/// Iterator yielding the stable merge of two sorted slices
pub struct Merge<'a> {
    left: &'a [i32],
    right: &'a [i32],
    i: usize,
    j: usize,
}

impl<'a> Merge<'a> {
    pub fn new(left: &'a [i32], right: &'a [i32]) -> Self {
        Self {
            left,
            right,
            i: 0,
            j: 0,
        }
    }
}

impl Iterator for Merge<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        match (self.left.get(self.i), self.right.get(self.j)) {
            // Ties take from the left
            (Some(&l), Some(&r)) if l <= r => {
                self.i += 1;
                Some(l)
            }
            (_, Some(&r)) => {
                self.j += 1;
                Some(r)
            }
            (Some(&l), None) => {
                self.i += 1;
                Some(l)
            }
            (None, None) => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.left.len() - self.i) + (self.right.len() - self.j);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Merge<'_> {}
