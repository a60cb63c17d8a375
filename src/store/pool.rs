//! Fixed-capacity bump pools
//!
//! Every piece of geometry and pixel data lives in one of these. The backing
//! array is allocated once at startup; `allocate` only moves a cursor, and
//! nothing is handed back until `reset`.

use thiserror::Error;

/// `(offset, count)` range into a pool. Never a pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: u32,
    pub count: u32,
}

impl Span {
    pub const EMPTY: Span = Span { offset: 0, count: 0 };

    pub fn new(offset: u32, count: u32) -> Self {
        Self { offset, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn end(&self) -> u32 {
        self.offset + self.count
    }

    fn range(&self) -> std::ops::Range<usize> {
        self.offset as usize..self.end() as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("{pool} pool exhausted: requested {requested}, {available} left")]
    Exhausted {
        pool: &'static str,
        requested: u32,
        available: u32,
    },
}

/// Monotonic allocator over a fixed array of `T`.
pub struct PoolAllocator<T> {
    name: &'static str,
    data: Vec<T>,
    used: u32,
}

impl<T: Copy + Default> PoolAllocator<T> {
    /// Allocate the full backing array up front.
    pub fn new(name: &'static str, capacity: u32) -> Self {
        Self {
            name,
            data: vec![T::default(); capacity as usize],
            used: 0,
        }
    }

    /// Reserve `count` contiguous elements. Failure leaves the cursor where it was.
    pub fn allocate(&mut self, count: u32) -> Result<Span, PoolError> {
        let available = self.remaining();
        if count > available {
            return Err(PoolError::Exhausted {
                pool: self.name,
                requested: count,
                available,
            });
        }
        let span = Span::new(self.used, count);
        self.used += count;
        Ok(span)
    }

    /// Reserve space and copy `items` into it.
    pub fn push_slice(&mut self, items: &[T]) -> Result<Span, PoolError> {
        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
        let span = self.allocate(count)?;
        self.data[span.range()].copy_from_slice(items);
        Ok(span)
    }

    /// Elements of a span; out-of-range spans yield an empty slice.
    pub fn slice(&self, span: Span) -> &[T] {
        if span.end() > self.used {
            return &[];
        }
        &self.data[span.range()]
    }

    pub fn slice_mut(&mut self, span: Span) -> &mut [T] {
        if span.end() > self.used {
            return &mut [];
        }
        &mut self.data[span.range()]
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        if index >= self.used {
            return None;
        }
        self.data.get(index as usize)
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn remaining(&self) -> u32 {
        self.capacity() - self.used
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Forget every allocation. Existing spans become dangling.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}
