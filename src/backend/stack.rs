//! Operand stack.
//!
//! Objects are addressed by their distance from the top: index 0 is the most
//! recently pushed object. Capacity doubles until it reaches
//! [`LINEAR_GROWTH_STEP`] and grows by that step afterwards. It never shrinks.
//! Growth goes through fallible reservation, so exhaustion surfaces as
//! [`VmError::NoMem`] instead of aborting.

use crate::backend::bytecode::vm::{VmError, VmResult};
use crate::backend::models::Object;

/// Reserve used when none is requested
pub const DEFAULT_RESERVE: usize = 16;

/// Capacity past which growth switches from doubling to fixed increments
pub const LINEAR_GROWTH_STEP: usize = 65536;

#[derive(Debug, Default)]
pub struct Stack {
    items: Vec<Object>,
}

impl Stack {
    /// Create a stack with the default reserve
    pub fn new() -> Self {
        Self::with_reserve(DEFAULT_RESERVE)
    }

    /// Create a stack with room for `reserve` objects (0 means default)
    pub fn with_reserve(reserve: usize) -> Self {
        let reserve = if reserve == 0 { DEFAULT_RESERVE } else { reserve };
        Self {
            items: Vec::with_capacity(reserve),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    fn grow(&mut self) -> VmResult<()> {
        let capacity = self.items.capacity();
        let target = if capacity == 0 {
            DEFAULT_RESERVE
        } else if capacity < LINEAR_GROWTH_STEP {
            (capacity * 2).min(LINEAR_GROWTH_STEP)
        } else {
            capacity.checked_add(LINEAR_GROWTH_STEP).ok_or(VmError::NoMem)?
        };
        self.items
            .try_reserve_exact(target - self.items.len())
            .map_err(|_| VmError::NoMem)
    }

    /// Push an object, growing the backing store if it is full
    pub fn push(&mut self, object: Object) -> VmResult<()> {
        if self.items.len() == self.items.capacity() {
            self.grow()?;
        }
        self.items.push(object);
        Ok(())
    }

    /// Push `object` if there is one; pushing nothing is a no-op
    pub fn push_opt(&mut self, object: Option<Object>) -> VmResult<()> {
        match object {
            Some(object) => self.push(object),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Object> {
        self.items.pop()
    }

    #[inline]
    fn slot(&self, index: usize) -> Option<usize> {
        self.items.len().checked_sub(index + 1)
    }

    /// Object at `index` from the top
    #[inline]
    pub fn at(&self, index: usize) -> Option<&Object> {
        self.slot(index).map(|slot| &self.items[slot])
    }

    #[inline]
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.slot(index).map(move |slot| &mut self.items[slot])
    }

    /// Remove the top `n` objects and hand them to the caller, deepest first.
    ///
    /// Asking for more than the stack holds empties it and fails with
    /// `InvalidDiscard`.
    pub fn discard(&mut self, n: usize) -> VmResult<Vec<Object>> {
        if n > self.items.len() {
            self.items.clear();
            return Err(VmError::InvalidDiscard);
        }
        let at = self.items.len() - n;
        Ok(self.items.split_off(at))
    }

    /// Replace the object at `index` from the top, returning the previous one
    pub fn set(&mut self, index: usize, object: Object) -> VmResult<Object> {
        let slot = self.slot(index).ok_or(VmError::StackRange)?;
        Ok(std::mem::replace(&mut self.items[slot], object))
    }

    /// Exchange the top two objects
    pub fn swap_top(&mut self) -> VmResult<()> {
        let len = self.items.len();
        if len < 2 {
            return Err(VmError::NotEnoughArgs);
        }
        self.items.swap(len - 1, len - 2);
        Ok(())
    }

    /// Rotate the top `n` objects so that the new object at index `i` is the
    /// old object at index `(i + d) mod n`.
    pub fn rotate_top(&mut self, n: usize, d: isize) -> VmResult<()> {
        if n > self.items.len() {
            return Err(VmError::StackRange);
        }
        if n == 0 {
            return Ok(());
        }
        let shift = d.rem_euclid(n as isize) as usize;
        let start = self.items.len() - n;
        // Top-relative index i lives at slot len-1-i, so pulling from i+d
        // moves every slot down by d in bottom-relative terms.
        self.items[start..].rotate_right(shift);
        Ok(())
    }

    /// Reverse the order of the top `n` objects
    pub fn reverse_top(&mut self, n: usize) -> VmResult<()> {
        if n > self.items.len() {
            return Err(VmError::StackRange);
        }
        let start = self.items.len() - n;
        self.items[start..].reverse();
        Ok(())
    }

    /// Iterate from the top of the stack downwards
    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.items.iter().rev()
    }

    /// Distance from the top to the nearest mark
    pub fn nearest_mark(&self) -> Option<usize> {
        self.iter().position(Object::is_mark)
    }

    /// Drop every object
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drain the stack into a vector ordered top first
    pub fn take_all(&mut self) -> Vec<Object> {
        let mut items = std::mem::take(&mut self.items);
        items.reverse();
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(stack: &Stack) -> Vec<i32> {
        stack.iter().map(|o| o.as_integer().unwrap()).collect()
    }

    fn stack_of(values: &[i32]) -> Stack {
        let mut stack = Stack::new();
        for v in values {
            stack.push(Object::integer(*v)).unwrap();
        }
        stack
    }

    #[test]
    fn test_push_pop_at() {
        let mut stack = stack_of(&[1, 2, 3]);
        assert_eq!(stack.size(), 3);
        assert_eq!(stack.at(0).and_then(Object::as_integer), Some(3));
        assert_eq!(stack.at(2).and_then(Object::as_integer), Some(1));
        assert!(stack.at(3).is_none());
        assert_eq!(stack.pop().and_then(|o| o.as_integer()), Some(3));
        assert_eq!(stack.size(), 2);
    }

    #[test]
    fn test_push_nothing_is_ignored() {
        let mut stack = Stack::new();
        stack.push_opt(None).unwrap();
        assert!(stack.is_empty());
        stack.push_opt(Some(Object::mark())).unwrap();
        assert_eq!(stack.size(), 1);
    }

    #[test]
    fn test_growth_policy() {
        let mut stack = Stack::with_reserve(4);
        assert_eq!(stack.capacity(), 4);
        for i in 0..5 {
            stack.push(Object::integer(i)).unwrap();
        }
        assert_eq!(stack.capacity(), 8);
        for i in 0..4 {
            stack.push(Object::integer(i)).unwrap();
        }
        assert_eq!(stack.capacity(), 16);
    }

    #[test]
    fn test_growth_switches_to_fixed_steps() {
        let mut stack = Stack::new();
        let mut capacities = vec![stack.capacity()];
        for _ in 0..200_000 {
            stack.push(Object::mark()).unwrap();
            if stack.capacity() != *capacities.last().unwrap() {
                capacities.push(stack.capacity());
            }
        }

        let doubling: Vec<usize> = (4..=16).map(|shift| 1usize << shift).collect();
        assert_eq!(capacities[..doubling.len()], doubling[..]);
        assert_eq!(
            capacities[doubling.len()..],
            [2 * LINEAR_GROWTH_STEP, 3 * LINEAR_GROWTH_STEP, 4 * LINEAR_GROWTH_STEP]
        );
    }

    #[test]
    fn test_discard() {
        let mut stack = stack_of(&[1, 2, 3, 4]);
        let removed = stack.discard(2).unwrap();
        assert_eq!(removed, vec![Object::integer(3), Object::integer(4)]);
        assert_eq!(ints(&stack), vec![2, 1]);
    }

    #[test]
    fn test_discard_too_many_empties_stack() {
        let mut stack = stack_of(&[1, 2]);
        assert_eq!(stack.discard(3), Err(VmError::InvalidDiscard));
        assert_eq!(stack.size(), 0);
    }

    #[test]
    fn test_set_returns_previous() {
        let mut stack = stack_of(&[1, 2]);
        let old = stack.set(1, Object::integer(9)).unwrap();
        assert_eq!(old.as_integer(), Some(1));
        assert_eq!(ints(&stack), vec![2, 9]);
        assert_eq!(stack.set(2, Object::mark()), Err(VmError::StackRange));
    }

    #[test]
    fn test_rotate_top() {
        // top first: 4 3 2 1
        let mut stack = stack_of(&[1, 2, 3, 4]);
        stack.rotate_top(3, 1).unwrap();
        // new[i] = old[(i+1) % 3] over [4, 3, 2]
        assert_eq!(ints(&stack), vec![3, 2, 4, 1]);
        stack.rotate_top(3, -1).unwrap();
        assert_eq!(ints(&stack), vec![4, 3, 2, 1]);
        stack.rotate_top(4, 0).unwrap();
        assert_eq!(ints(&stack), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_reverse_top() {
        let mut stack = stack_of(&[1, 2, 3, 4]);
        stack.reverse_top(3).unwrap();
        assert_eq!(ints(&stack), vec![2, 3, 4, 1]);
        assert_eq!(stack.reverse_top(5), Err(VmError::StackRange));
    }

    #[test]
    fn test_nearest_mark() {
        let mut stack = stack_of(&[1]);
        assert_eq!(stack.nearest_mark(), None);
        stack.push(Object::mark()).unwrap();
        stack.push(Object::integer(2)).unwrap();
        stack.push(Object::integer(3)).unwrap();
        assert_eq!(stack.nearest_mark(), Some(2));
    }
}
