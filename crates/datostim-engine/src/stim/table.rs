/// Fixed-capacity table addressed by index.
///
/// Entries `0..count` exist; `count` is one past the highest index ever defined.
/// Defining index `k` brings every entry up to `k` into existence with its default
/// value. Indices `>= N` are rejected and leave the table untouched.
#[derive(Debug)]
pub struct BoundedTable<T, const N: usize> {
    items: [T; N],
    count: usize,
}

impl<T: Default, const N: usize> Default for BoundedTable<T, N> {
    fn default() -> Self {
        Self {
            items: std::array::from_fn(|_| T::default()),
            count: 0,
        }
    }
}

impl<T, const N: usize> BoundedTable<T, N> {
    pub const CAPACITY: usize = N;

    /// Number of existing entries.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns an existing entry.
    #[inline]
    pub fn get(&self, index: u32) -> Option<&T> {
        self.as_slice().get(index as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index as usize)
    }

    /// Returns the entry at `index`, defining it (and every lower index) if needed.
    ///
    /// Returns `None` when `index` is beyond capacity.
    pub fn define(&mut self, index: u32) -> Option<&mut T> {
        let i = index as usize;
        if i >= N {
            return None;
        }
        self.count = self.count.max(i + 1);
        Some(&mut self.items[i])
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.count]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items[..self.count]
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.as_slice().iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.as_mut_slice().iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_grows_densely() {
        let mut t: BoundedTable<u32, 4> = BoundedTable::default();
        assert!(t.is_empty());

        *t.define(2).unwrap() = 7;
        assert_eq!(t.count(), 3);
        assert_eq!(t.get(0), Some(&0));
        assert_eq!(t.get(2), Some(&7));
        assert_eq!(t.get(3), None);
    }

    #[test]
    fn define_lower_index_keeps_count() {
        let mut t: BoundedTable<u32, 4> = BoundedTable::default();
        t.define(3);
        t.define(1);
        assert_eq!(t.count(), 4);
    }

    #[test]
    fn out_of_range_is_rejected_without_change() {
        let mut t: BoundedTable<u32, 4> = BoundedTable::default();
        t.define(1);
        assert!(t.define(4).is_none());
        assert!(t.define(u32::MAX).is_none());
        assert_eq!(t.count(), 2);
    }
}
