//! LIFO stack over owned linked nodes, used for play history.

use std::fmt;

use super::circular_list::CircularList;

struct Node<T> {
    value: T,
    next: Option<Box<Node<T>>>,
}

/// Singly-linked LIFO stack. `top` is None iff the stack is empty.
pub struct Stack<T> {
    top: Option<Box<Node<T>>>,
    len: usize,
}

impl<T> Stack<T> {
    pub const fn new() -> Self {
        Self { top: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    /// Pushes a value as the new top. O(1).
    pub fn push(&mut self, value: T) {
        self.top = Some(Box::new(Node {
            value,
            next: self.top.take(),
        }));
        self.len += 1;
    }

    /// Pops the top value, advancing top to its successor. None when
    /// empty.
    pub fn pop(&mut self) -> Option<T> {
        let node = *self.top.take()?;
        self.top = node.next;
        self.len -= 1;
        Some(node.value)
    }

    /// Non-destructive read of the top value.
    pub fn peek(&self) -> Option<&T> {
        self.top.as_ref().map(|node| &node.value)
    }

    /// Drops every node and resets to empty.
    pub fn clear(&mut self) {
        // Unlink iteratively so a deep stack cannot overflow on drop.
        let mut current = self.top.take();
        while let Some(mut node) = current {
            current = node.next.take();
        }
        self.len = 0;
    }

    /// Copies the values into a new list, top to bottom, without
    /// touching the stack's own nodes.
    pub fn snapshot(&self) -> CircularList<T>
    where
        T: Clone,
    {
        let mut list = CircularList::new();
        let mut current = self.top.as_deref();
        while let Some(node) = current {
            list.append(node.value.clone());
            current = node.next.as_deref();
        }
        list
    }
}

impl<T> Drop for Stack<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = f.debug_list();
        let mut current = self.top.as_deref();
        while let Some(node) = current {
            entries.entry(&node.value);
            current = node.next.as_deref();
        }
        entries.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_last_in_first() {
        let mut stack = Stack::new();
        stack.push('a');
        stack.push('b');
        stack.push('c');
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop(), Some('c'));
        assert_eq!(stack.pop(), Some('b'));
        assert_eq!(stack.pop(), Some('a'));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut stack = Stack::new();
        assert_eq!(stack.peek(), None);
        stack.push(1);
        stack.push(2);
        assert_eq!(stack.peek(), Some(&2));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn clear_empties_the_stack() {
        let mut stack = Stack::new();
        for n in 0..100 {
            stack.push(n);
        }
        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn snapshot_is_top_to_bottom_and_independent() {
        let mut stack = Stack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        let snapshot = stack.snapshot();
        let values: Vec<i32> = snapshot.iter().copied().collect();
        assert_eq!(values, vec![3, 2, 1]);
        // The stack itself is untouched.
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop(), Some(3));
    }
}
