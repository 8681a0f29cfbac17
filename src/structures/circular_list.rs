//! Circular doubly-linked list with positional access and embedded sorts.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

struct Node<T> {
    value: T,
    prev: NonNull<Node<T>>,
    next: NonNull<Node<T>>,
}

/// Circular doubly-linked list.
///
/// For a non-empty list, `head.prev == tail` and `tail.next == head`.
/// The index domain is `[0, len)`. Nodes never escape the list: every
/// link mutation happens inside these methods, and removal unlinks and
/// drops the node before returning.
pub struct CircularList<T> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    len: usize,
    marker: PhantomData<Box<Node<T>>>,
}

unsafe impl<T: Send> Send for CircularList<T> {}
unsafe impl<T: Sync> Sync for CircularList<T> {}

impl<T> CircularList<T> {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Appends a value at the tail and re-closes the circle. O(1).
    pub fn append(&mut self, value: T) {
        let node = NonNull::from(Box::leak(Box::new(Node {
            value,
            prev: NonNull::dangling(),
            next: NonNull::dangling(),
        })));
        unsafe {
            match (self.head, self.tail) {
                (Some(head), Some(tail)) => {
                    (*node.as_ptr()).prev = tail;
                    (*node.as_ptr()).next = head;
                    (*tail.as_ptr()).next = node;
                    (*head.as_ptr()).prev = node;
                    self.tail = Some(node);
                }
                _ => {
                    // Sole node: links to itself in both directions.
                    (*node.as_ptr()).prev = node;
                    (*node.as_ptr()).next = node;
                    self.head = Some(node);
                    self.tail = Some(node);
                }
            }
        }
        self.len += 1;
    }

    /// Removes the value at `index`, preserving circularity.
    ///
    /// Returns false without touching the list when `index` is out of
    /// range or the list is empty.
    pub fn remove_at(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let Some(head) = self.head else {
            return false;
        };
        unsafe {
            if self.len == 1 {
                self.head = None;
                self.tail = None;
                drop(Box::from_raw(head.as_ptr()));
            } else if index == 0 {
                let tail = (*head.as_ptr()).prev;
                let new_head = (*head.as_ptr()).next;
                (*new_head.as_ptr()).prev = tail;
                (*tail.as_ptr()).next = new_head;
                self.head = Some(new_head);
                drop(Box::from_raw(head.as_ptr()));
            } else {
                let mut current = head;
                for _ in 0..index {
                    current = (*current.as_ptr()).next;
                }
                let prev = (*current.as_ptr()).prev;
                let next = (*current.as_ptr()).next;
                (*prev.as_ptr()).next = next;
                (*next.as_ptr()).prev = prev;
                if self.tail == Some(current) {
                    self.tail = Some(prev);
                }
                drop(Box::from_raw(current.as_ptr()));
            }
        }
        self.len -= 1;
        true
    }

    /// Returns the value at `index`, walking from the head. None when
    /// out of range.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let mut current = self.head?;
        unsafe {
            for _ in 0..index {
                current = current.as_ref().next;
            }
            Some(&current.as_ref().value)
        }
    }

    /// Linear search by value equality. Traversal is bounded at `len`
    /// steps regardless of the circular links.
    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        let mut current = self.head?;
        for index in 0..self.len {
            unsafe {
                if current.as_ref().value == *value {
                    return Some(index);
                }
                current = current.as_ref().next;
            }
        }
        None
    }

    /// Visits every element exactly once in head-to-tail order, passing
    /// the value and its index.
    pub fn for_each(&self, mut visitor: impl FnMut(&T, usize)) {
        let Some(head) = self.head else {
            return;
        };
        let mut current = head;
        for index in 0..self.len {
            unsafe {
                visitor(&current.as_ref().value, index);
                current = current.as_ref().next;
            }
        }
    }

    /// Borrowing head-to-tail iterator, bounded at `len` steps.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            current: self.head,
            remaining: self.len,
            marker: PhantomData,
        }
    }

    /// Bubble sort over the stored values; node identities are untouched.
    ///
    /// Repeated full passes swap adjacent values whenever the comparator
    /// orders them `Greater`, terminating once a pass makes no swap.
    /// Stable; worst case O(n²).
    pub fn bubble_sort(&mut self, mut comparator: impl FnMut(&T, &T) -> Ordering) {
        if self.len < 2 {
            return;
        }
        let Some(head) = self.head else {
            return;
        };
        loop {
            let mut swapped = false;
            let mut current = head;
            for _ in 0..self.len - 1 {
                unsafe {
                    let next = current.as_ref().next;
                    if comparator(&current.as_ref().value, &next.as_ref().value)
                        == Ordering::Greater
                    {
                        mem::swap(&mut (*current.as_ptr()).value, &mut (*next.as_ptr()).value);
                        swapped = true;
                    }
                    current = next;
                }
            }
            if !swapped {
                break;
            }
        }
    }

    /// Insertion sort: copies the values into a scratch buffer, sorts it
    /// by shifting right while the predecessor orders `Greater`, then
    /// writes the result back into the existing nodes in position order.
    ///
    /// Stable, so it agrees with `bubble_sort` for any input and
    /// comparator.
    pub fn insertion_sort(&mut self, mut comparator: impl FnMut(&T, &T) -> Ordering)
    where
        T: Clone,
    {
        if self.len < 2 {
            return;
        }
        let mut values: Vec<T> = self.iter().cloned().collect();
        for i in 1..values.len() {
            let key = values[i].clone();
            let mut j = i;
            while j > 0 && comparator(&values[j - 1], &key) == Ordering::Greater {
                values[j] = values[j - 1].clone();
                j -= 1;
            }
            values[j] = key;
        }
        let Some(head) = self.head else {
            return;
        };
        let mut current = head;
        for value in values {
            unsafe {
                (*current.as_ptr()).value = value;
                current = current.as_ref().next;
            }
        }
    }

    /// Drops every node and resets the list to empty.
    pub fn clear(&mut self) {
        let Some(head) = self.head.take() else {
            return;
        };
        let mut current = head;
        for _ in 0..self.len {
            unsafe {
                let next = current.as_ref().next;
                drop(Box::from_raw(current.as_ptr()));
                current = next;
            }
        }
        self.tail = None;
        self.len = 0;
    }

    /// Checks the circular invariant: walking `len` steps from the head
    /// lands back on the head, and the head/tail back-links close the
    /// circle.
    #[cfg(test)]
    pub(crate) fn is_circular(&self) -> bool {
        match (self.head, self.tail) {
            (None, None) => self.len == 0,
            (Some(head), Some(tail)) => unsafe {
                if head.as_ref().prev != tail || tail.as_ref().next != head {
                    return false;
                }
                let mut current = head;
                for _ in 0..self.len {
                    current = current.as_ref().next;
                }
                current == head
            },
            _ => false,
        }
    }
}

impl<T> Drop for CircularList<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for CircularList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, T> {
    current: Option<NonNull<Node<T>>>,
    remaining: usize,
    marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.current?;
        self.remaining -= 1;
        unsafe {
            self.current = Some(node.as_ref().next);
            Some(&node.as_ref().value)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a CircularList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
