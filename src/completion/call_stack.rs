//! Rule call stack owned by a single completion request.

use std::ops::{Deref, DerefMut};

/// Indices of the rules entered so far, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    rules: Vec<usize>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `rule_index` for as long as the returned frame lives.
    pub fn enter(&mut self, rule_index: usize) -> RuleFrame<'_> {
        self.rules.push(rule_index);
        RuleFrame { stack: self }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.rules
    }

    pub fn contains(&self, rule_index: usize) -> bool {
        self.rules.contains(&rule_index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Copy of the stack with `tail` appended.
    pub fn extended(&self, tail: &[usize]) -> Vec<usize> {
        let mut path = Vec::with_capacity(self.rules.len() + tail.len());
        path.extend_from_slice(&self.rules);
        path.extend_from_slice(tail);
        path
    }
}

/// A rule pushed onto a [`CallStack`]; popped again on drop, whichever way
/// the rule is left.
#[derive(Debug)]
pub struct RuleFrame<'a> {
    stack: &'a mut CallStack,
}

impl Deref for RuleFrame<'_> {
    type Target = CallStack;

    fn deref(&self) -> &CallStack {
        self.stack
    }
}

impl DerefMut for RuleFrame<'_> {
    fn deref_mut(&mut self) -> &mut CallStack {
        self.stack
    }
}

impl Drop for RuleFrame<'_> {
    fn drop(&mut self) {
        self.stack.rules.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_pop_in_lifo_order() {
        let mut stack = CallStack::new();
        {
            let mut outer = stack.enter(0);
            {
                let inner = outer.enter(3);
                assert_eq!(inner.as_slice(), &[0, 3]);
            }
            assert_eq!(outer.as_slice(), &[0]);
        }
        assert!(stack.is_empty());
    }

    #[test]
    fn test_frame_pops_on_early_return() {
        fn fails(stack: &mut CallStack) -> Result<(), ()> {
            let frame = stack.enter(7);
            assert!(frame.contains(7));
            Err(())
        }

        let mut stack = CallStack::new();
        assert!(fails(&mut stack).is_err());
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn test_extended_copies() {
        let mut stack = CallStack::new();
        let frame = stack.enter(1);
        let path = frame.extended(&[4, 5]);
        assert_eq!(path, vec![1, 4, 5]);
        assert_eq!(frame.len(), 1);
    }
}
