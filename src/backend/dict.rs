//! Binding dictionary.
//!
//! Fixed-size hash table keyed by the 32-bit reference hash. The bucket count
//! is a power of two picked at creation and never changes; the low bits of
//! the key select the bucket. Each bucket is a chain kept in ascending key
//! order, stored inline while short.

use smallvec::SmallVec;

use crate::backend::models::Object;

/// Smallest accepted size exponent
pub const MIN_SIZE_EXP: u32 = 4;
/// Exponent used when 0 is requested
pub const DEFAULT_SIZE_EXP: u32 = 10;
/// Largest accepted size exponent
pub const MAX_SIZE_EXP: u32 = 16;

type Chain = SmallVec<[(u32, Object); 2]>;

#[derive(Debug)]
pub struct Dict {
    buckets: Vec<Chain>,
    mask: u32,
    len: usize,
}

impl Dict {
    /// Create a dictionary with `2^size_exp` buckets. The exponent is clamped
    /// to `[MIN_SIZE_EXP, MAX_SIZE_EXP]`; 0 selects `DEFAULT_SIZE_EXP`.
    pub fn new(size_exp: u32) -> Self {
        let size_exp = if size_exp == 0 {
            DEFAULT_SIZE_EXP
        } else {
            size_exp.clamp(MIN_SIZE_EXP, MAX_SIZE_EXP)
        };
        let size = 1usize << size_exp;
        let mut buckets = Vec::with_capacity(size);
        buckets.resize_with(size, Chain::new);
        Self {
            buckets,
            mask: (size - 1) as u32,
            len: 0,
        }
    }

    #[inline]
    fn bucket(&self, key: u32) -> usize {
        (key & self.mask) as usize
    }

    /// Number of buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of bound keys
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bind `key` to `value`. Returns the value previously bound to `key`,
    /// which the caller is responsible for releasing.
    pub fn set(&mut self, key: u32, value: Object) -> Option<Object> {
        let bucket = self.bucket(key);
        let chain = &mut self.buckets[bucket];
        let at = chain.partition_point(|(k, _)| *k < key);
        match chain.get_mut(at) {
            Some((k, slot)) if *k == key => Some(std::mem::replace(slot, value)),
            _ => {
                chain.insert(at, (key, value));
                self.len += 1;
                None
            }
        }
    }

    fn position(&self, key: u32) -> Option<(usize, usize)> {
        let bucket = self.bucket(key);
        let chain = &self.buckets[bucket];
        // Chains are sorted, so the scan stops at the first larger key.
        for (i, (k, _)) in chain.iter().enumerate() {
            if *k == key {
                return Some((bucket, i));
            }
            if *k > key {
                break;
            }
        }
        None
    }

    pub fn get(&self, key: u32) -> Option<&Object> {
        self.position(key)
            .map(|(bucket, i)| &self.buckets[bucket][i].1)
    }

    pub fn get_mut(&mut self, key: u32) -> Option<&mut Object> {
        self.position(key)
            .map(move |(bucket, i)| &mut self.buckets[bucket][i].1)
    }

    pub fn contains(&self, key: u32) -> bool {
        self.position(key).is_some()
    }

    /// Unbind `key`, handing back its value
    pub fn remove(&mut self, key: u32) -> Option<Object> {
        let (bucket, i) = self.position(key)?;
        self.len -= 1;
        Some(self.buckets[bucket].remove(i).1)
    }

    /// Iterate over every binding, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Object)> {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter().map(|(k, v)| (*k, v)))
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE_EXP)
    }
}
