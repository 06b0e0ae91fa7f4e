//! Integer recycling pool.
//!
//! Integers dominate allocation traffic, so freed integer boxes are kept in a
//! bounded free list and reinitialised on the next request. The pool is
//! invisible to program semantics; a capacity of 0 disables it.

use tracing::trace;

use crate::backend::models::Object;

/// Allocation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Requests served from the free list
    pub recycled: u64,
    /// Requests that needed a fresh allocation
    pub allocated: u64,
    /// Integers returned to the free list
    pub returned: u64,
    /// Integers dropped because the free list was full
    pub dropped: u64,
}

impl PoolStats {
    /// Fraction of requests served from the free list
    pub fn hit_rate(&self) -> f64 {
        let total = self.recycled + self.allocated;
        if total == 0 {
            0.0
        } else {
            self.recycled as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct IntegerPool {
    free: Vec<Box<i32>>,
    capacity: usize,
    stats: PoolStats,
}

impl IntegerPool {
    /// Create an empty pool holding at most `capacity` integers.
    ///
    /// The free list storage is reserved up front; `None` means the
    /// reservation failed.
    pub fn new(capacity: usize) -> Option<Self> {
        let mut free = Vec::new();
        free.try_reserve_exact(capacity).ok()?;
        Some(Self {
            free,
            capacity,
            stats: PoolStats::default(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of integers waiting to be reused
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Integer allocation holding `value`
    pub fn get(&mut self, value: i32) -> Box<i32> {
        match self.free.pop() {
            Some(mut slot) => {
                self.stats.recycled += 1;
                *slot = value;
                slot
            }
            None => {
                self.stats.allocated += 1;
                Box::new(value)
            }
        }
    }

    /// Take ownership of `object`, keeping its allocation if it is an
    /// integer and the pool has room. Anything else is dropped.
    pub fn release(&mut self, object: Object) {
        if let Object::Integer(slot) = object {
            if self.free.len() < self.capacity {
                self.stats.returned += 1;
                self.free.push(slot);
            } else {
                self.stats.dropped += 1;
            }
        }
    }
}

impl Drop for IntegerPool {
    fn drop(&mut self) {
        trace!(
            target: "avm::pool",
            recycled = self.stats.recycled,
            allocated = self.stats.allocated,
            returned = self.stats.returned,
            dropped = self.stats.dropped,
            "integer pool released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recycles_released_integers() {
        let mut pool = IntegerPool::new(2).unwrap();
        let a = pool.get(1);
        assert_eq!(*a, 1);
        pool.release(Object::Integer(a));
        assert_eq!(pool.available(), 1);

        let b = pool.get(42);
        assert_eq!(*b, 42);
        assert_eq!(pool.available(), 0);

        let stats = pool.stats();
        assert_eq!(stats.recycled, 1);
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.returned, 1);
    }

    #[test]
    fn test_bounded_capacity() {
        let mut pool = IntegerPool::new(1).unwrap();
        pool.release(Object::integer(1));
        pool.release(Object::integer(2));
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.stats().dropped, 1);
    }

    #[test]
    fn test_zero_capacity_is_direct_allocation() {
        let mut pool = IntegerPool::new(0).unwrap();
        pool.release(Object::integer(5));
        assert_eq!(pool.available(), 0);
        assert_eq!(*pool.get(7), 7);
        assert_eq!(pool.stats().recycled, 0);
    }

    #[test]
    fn test_non_integers_are_dropped() {
        let mut pool = IntegerPool::new(4).unwrap();
        pool.release(Object::text("abc"));
        pool.release(Object::mark());
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn test_hit_rate() {
        let mut pool = IntegerPool::new(4).unwrap();
        assert_eq!(pool.stats().hit_rate(), 0.0);
        let a = pool.get(0);
        pool.release(Object::Integer(a));
        let _ = pool.get(0);
        assert_eq!(pool.stats().hit_rate(), 0.5);
    }
}
