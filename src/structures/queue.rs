//! FIFO queue over owned linked nodes, used for pending tracks.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::circular_list::CircularList;

struct Node<T> {
    value: T,
    next: Option<Box<Node<T>>>,
}

/// Singly-linked FIFO queue with an O(1) back pointer.
///
/// `front` and `back` are both null iff the queue is empty. Nodes are
/// owned front-to-back through `Box` links; `back` is a raw cursor to
/// the last node and is only dereferenced inside `enqueue`.
pub struct Queue<T> {
    front: Option<Box<Node<T>>>,
    back: Option<NonNull<Node<T>>>,
    len: usize,
    marker: PhantomData<Box<Node<T>>>,
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Sync> Sync for Queue<T> {}

impl<T> Queue<T> {
    pub const fn new() -> Self {
        Self {
            front: None,
            back: None,
            len: 0,
            marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.front.is_none()
    }

    /// Appends a value at the back; becomes the front when the queue was
    /// empty. O(1).
    pub fn enqueue(&mut self, value: T) {
        let mut node = Box::new(Node { value, next: None });
        let ptr = NonNull::from(node.as_mut());
        match self.back {
            Some(back) => unsafe {
                (*back.as_ptr()).next = Some(node);
            },
            None => self.front = Some(node),
        }
        self.back = Some(ptr);
        self.len += 1;
    }

    /// Removes and returns the front value, advancing front to its
    /// successor. Clears the back pointer when the queue drains.
    pub fn dequeue(&mut self) -> Option<T> {
        let node = *self.front.take()?;
        self.front = node.next;
        if self.front.is_none() {
            self.back = None;
        }
        self.len -= 1;
        Some(node.value)
    }

    /// Non-destructive read of the front value.
    pub fn peek(&self) -> Option<&T> {
        self.front.as_ref().map(|node| &node.value)
    }

    /// Drops every node and resets to empty.
    pub fn clear(&mut self) {
        // Unlink iteratively so a long queue cannot overflow on drop.
        let mut current = self.front.take();
        while let Some(mut node) = current {
            current = node.next.take();
        }
        self.back = None;
        self.len = 0;
    }

    /// Copies the values into a new list, front to back, without
    /// touching the queue's own nodes.
    pub fn snapshot(&self) -> CircularList<T>
    where
        T: Clone,
    {
        let mut list = CircularList::new();
        let mut current = self.front.as_deref();
        while let Some(node) = current {
            list.append(node.value.clone());
            current = node.next.as_deref();
        }
        list
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = f.debug_list();
        let mut current = self.front.as_deref();
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
    fn dequeue_returns_first_in_first() {
        let mut queue = Queue::new();
        queue.enqueue('a');
        queue.enqueue('b');
        queue.enqueue('c');
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue(), Some('a'));
        assert_eq!(queue.dequeue(), Some('b'));
        assert_eq!(queue.dequeue(), Some('c'));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn draining_clears_the_back_pointer() {
        let mut queue = Queue::new();
        queue.enqueue(1);
        assert_eq!(queue.dequeue(), Some(1));
        assert!(queue.back.is_none());
        // Re-use after draining still works.
        queue.enqueue(2);
        queue.enqueue(3);
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), Some(3));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut queue = Queue::new();
        assert_eq!(queue.peek(), None);
        queue.enqueue(5);
        queue.enqueue(6);
        assert_eq!(queue.peek(), Some(&5));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn clear_empties_the_queue() {
        let mut queue = Queue::new();
        for n in 0..100 {
            queue.enqueue(n);
        }
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue(), None);
        assert!(queue.back.is_none());
    }

    #[test]
    fn snapshot_is_front_to_back_and_independent() {
        let mut queue = Queue::new();
        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(3);
        let snapshot = queue.snapshot();
        let values: Vec<i32> = snapshot.iter().copied().collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue(), Some(1));
    }
}
