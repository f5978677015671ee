//! An ordered map implemented with an AVL tree.

use std::cmp;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use thiserror::Error;

/// A strict weak ordering over keys of type `K`.
///
/// Two keys `a` and `b` are considered equivalent when neither
/// `less(a, b)` nor `less(b, a)` holds. The map stores at most one
/// entry per equivalence class.
///
/// A comparator that is not a valid strict weak order leaves the tree
/// in an unspecified (but memory safe) shape.
pub trait Compare<K: ?Sized> {
    fn less(&self, a: &K, b: &K) -> bool;
}

/// The natural ordering of a key type, via [`Ord`].
///
/// This is the default comparator of [`AvlMap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Compare<K> for NaturalOrder {
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

/// Any binary predicate acts as a comparator.
impl<K: ?Sized, F> Compare<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    fn less(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

/// The error returned by [`AvlMap::try_get`] when no entry matches the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key not found")]
pub struct KeyNotFound;

/// An ordered map implemented with an AVL tree.
///
/// Entries are kept sorted by a comparator supplied at construction,
/// defaulting to the natural ordering of the key type.
///
/// ```
/// use avlmap::AvlMap;
/// let mut map = AvlMap::new();
/// map.insert_or_assign(1, "one");
/// map.insert_or_assign(2, "two");
/// assert_eq!(map.get(&1), Some(&"one"));
/// map.remove(&1);
/// assert!(map.get(&1).is_none());
/// ```
pub struct AvlMap<K, V, C = NaturalOrder> {
    root: Link<K, V>,
    num_nodes: usize,
    cmp: C,
}

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    parent: Link<K, V>,
    height: usize,
}

type NodePtr<K, V> = NonNull<Node<K, V>>;
type Link<K, V> = Option<NodePtr<K, V>>;
type LinkPtr<K, V> = NonNull<Link<K, V>>;

enum SearchResult<K, V> {
    Occupied(NodePtr<K, V>),
    Vacant(Link<K, V>, LinkPtr<K, V>),
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

/// An iterator over the entries of a map in key order.
pub struct Iter<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    marker: PhantomData<(&'a K, &'a V)>,
}

/// A mutable iterator over the entries of a map in key order.
pub struct IterMut<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    marker: PhantomData<(&'a K, &'a mut V)>,
}

/// An iterator over the entries of a map equivalent to a given key.
///
/// This `struct` is created by the [`equal_range`] method on [`AvlMap`].
///
/// [`equal_range`]: struct.AvlMap.html#method.equal_range
pub struct Range<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    marker: PhantomData<(&'a K, &'a V)>,
}

impl<K, V> AvlMap<K, V> {
    /// Creates an empty map ordered by the keys' natural ordering.
    /// No memory is allocated until the first entry is inserted.
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V, C> AvlMap<K, V, C> {
    /// Creates an empty map ordered by the given comparator.
    /// No memory is allocated until the first entry is inserted.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            root: None,
            num_nodes: 0,
            cmp,
        }
    }

    /// Returns true if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree.
    /// An empty map has height 0, a single entry has height 1.
    pub fn height(&self) -> usize {
        match self.root {
            None => 0,
            Some(root_ptr) => unsafe { root_ptr.as_ref().height },
        }
    }

    /// Clears the map, deallocating all memory.
    pub fn clear(&mut self) {
        self.postorder(|node_ptr| unsafe {
            Node::destroy(node_ptr);
        });
        self.root = None;
        self.num_nodes = 0;
    }

    /// Exchanges the contents of two maps, comparators included.
    /// Runs in constant time; no entries are copied.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Gets an iterator over the entries of the map in key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            front: self.leftmost(),
            back: self.rightmost(),
            marker: PhantomData,
        }
    }

    /// Gets a mutable iterator over the entries of the map in key order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            front: self.leftmost(),
            back: self.rightmost(),
            marker: PhantomData,
        }
    }

    fn leftmost(&self) -> Link<K, V> {
        self.root.map(|root_ptr| unsafe { Node::leftmost(root_ptr) })
    }

    fn rightmost(&self) -> Link<K, V> {
        self.root.map(|root_ptr| unsafe { Node::rightmost(root_ptr) })
    }

    fn left_height(node_ptr: NodePtr<K, V>) -> usize {
        unsafe {
            match node_ptr.as_ref().left {
                None => 0,
                Some(left_ptr) => left_ptr.as_ref().height,
            }
        }
    }

    fn right_height(node_ptr: NodePtr<K, V>) -> usize {
        unsafe {
            match node_ptr.as_ref().right {
                None => 0,
                Some(right_ptr) => right_ptr.as_ref().height,
            }
        }
    }

    fn adjust_height(mut node_ptr: NodePtr<K, V>) {
        unsafe {
            node_ptr.as_mut().height =
                1 + cmp::max(Self::left_height(node_ptr), Self::right_height(node_ptr));
        }
    }

    fn rotate_left(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_mut().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                right_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(right_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(right_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(right_ptr);
                        }
                    }
                }

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);

                // Demoted node first, its new height feeds into the pivot's.
                Self::adjust_height(node_ptr);
                Self::adjust_height(right_ptr);
            }
        }
    }

    fn rotate_right(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                    left_right_ptr.as_mut().parent = Some(node_ptr);
                }

                left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(left_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(left_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(left_ptr);
                        }
                    }
                }

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(left_ptr);
            }
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    fn rebalance(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            self.rebalance_node(node_ptr);
            current = parent;
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// Stops after first rebalance operation.
    /// This is enough to restore balance after a single insert operation.
    fn rebalance_once(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            let did_rebalance = self.rebalance_node(node_ptr);
            if did_rebalance {
                break;
            }
            current = parent;
        }
    }

    /// Restores the AVL condition at given node if necessary and adjusts height.
    /// Resulting balance will be +1, 0 or -1 height difference between the subtrees.
    /// Initial imbalance must not exceed 2, which always holds after a single update.
    /// Returns whether rebalancing had been necessary.
    fn rebalance_node(&mut self, node_ptr: NodePtr<K, V>) -> bool {
        unsafe {
            let left_height = Self::left_height(node_ptr);
            let right_height = Self::right_height(node_ptr);
            debug_assert!(left_height <= right_height + 2);
            debug_assert!(right_height <= left_height + 2);
            if left_height > right_height + 1 {
                // Rebalance right
                let left_ptr = node_ptr.as_ref().left.unwrap();
                if Self::right_height(left_ptr) > Self::left_height(left_ptr) {
                    self.rotate_left(left_ptr);
                }
                self.rotate_right(node_ptr);
                true
            } else if right_height > left_height + 1 {
                // Rebalance left
                let right_ptr = node_ptr.as_ref().right.unwrap();
                if Self::left_height(right_ptr) > Self::right_height(right_ptr) {
                    self.rotate_right(right_ptr);
                }
                self.rotate_left(node_ptr);
                true
            } else {
                Self::adjust_height(node_ptr);
                false
            }
        }
    }

    fn unlink_node(&mut self, node_ptr: NodePtr<K, V>) {
        unsafe {
            // Check if node to-unlink has right sub tree
            if let Some(mut succ_ptr) = node_ptr.as_ref().right {
                // The in-order successor is the smallest node in the right sub tree
                let mut succ_parent_ptr = node_ptr;
                while let Some(left_ptr) = succ_ptr.as_ref().left {
                    succ_parent_ptr = succ_ptr;
                    succ_ptr = left_ptr;
                }

                // Successor is stem or leaf, unlink from tree
                debug_assert!(succ_ptr.as_ref().left.is_none());
                if succ_parent_ptr.as_ref().left == Some(succ_ptr) {
                    succ_parent_ptr.as_mut().left = succ_ptr.as_ref().right;
                } else {
                    succ_parent_ptr.as_mut().right = succ_ptr.as_ref().right;
                }
                if let Some(mut right_ptr) = succ_ptr.as_ref().right {
                    right_ptr.as_mut().parent = succ_ptr.as_ref().parent;
                }

                // Replace node to-unlink by its successor (up to 6 links)
                succ_ptr.as_mut().left = node_ptr.as_ref().left;
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = Some(succ_ptr);
                }

                succ_ptr.as_mut().right = node_ptr.as_ref().right;
                if let Some(mut right_ptr) = node_ptr.as_ref().right {
                    right_ptr.as_mut().parent = Some(succ_ptr);
                }

                succ_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(succ_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(succ_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(succ_ptr);
                        }
                    }
                }

                // The successor's former parent might be out of balance now
                let mut rebalance_from = succ_parent_ptr;
                if rebalance_from == node_ptr {
                    // Former parent is the unlinked node, which the successor replaced
                    rebalance_from = succ_ptr;
                }
                self.rebalance(Some(rebalance_from));
            } else {
                // Node to-unlink is stem or leaf, unlink from tree.
                debug_assert!(node_ptr.as_ref().right.is_none());
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                }
                match node_ptr.as_ref().parent {
                    None => self.root = node_ptr.as_ref().left,
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = node_ptr.as_ref().left;
                        } else {
                            parent_ptr.as_mut().right = node_ptr.as_ref().left
                        }
                        // Parent node might be out of balance now
                        self.rebalance(Some(parent_ptr));
                    }
                }
            }
        }
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn preorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(f, |_| {}, |_| {});
    }

    fn postorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(|_| {}, |_| {}, f);
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodePtr<K, V>),
        In: FnMut(NodePtr<K, V>),
        Post: FnMut(NodePtr<K, V>),
    {
        if let Some(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node_ptr);
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node_ptr);
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<K, V, C: Compare<K>> AvlMap<K, V, C> {
    /// Returns a reference to the value of the entry equivalent to the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        if let Some(node_ptr) = self.find_node(key) {
            return Some(&unsafe { &*node_ptr.as_ptr() }.value);
        }
        None
    }

    /// Returns a mutable reference to the value of the entry equivalent to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if let Some(node_ptr) = self.find_node(key) {
            return Some(&mut unsafe { &mut *node_ptr.as_ptr() }.value);
        }
        None
    }

    /// Returns references to the key-value pair of the entry equivalent to the key.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        if let Some(node_ptr) = self.find_node(key) {
            return Some((
                &unsafe { &*node_ptr.as_ptr() }.key,
                &unsafe { &*node_ptr.as_ptr() }.value,
            ));
        }
        None
    }

    /// Returns a reference to the value of the entry equivalent to the key,
    /// or [`KeyNotFound`] if there is no such entry.
    ///
    /// This is the only fallible read access; all other lookups report
    /// absence through their return value.
    pub fn try_get(&self, key: &K) -> Result<&V, KeyNotFound> {
        self.get(key).ok_or(KeyNotFound)
    }

    /// Returns true if the map contains an entry equivalent to the key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find_node(key).is_some()
    }

    /// Returns the number of entries equivalent to the key, which is 0 or 1.
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    /// Inserts a key-value pair into the map.
    /// If the map already had an entry with an equivalent key, its value
    /// is overwritten in place and the previous value is returned.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Option<V> {
        match self.search(&key) {
            SearchResult::Occupied(node_ptr) => {
                let node = unsafe { &mut *node_ptr.as_ptr() };
                Some(mem::replace(&mut node.value, value))
            }
            SearchResult::Vacant(parent, mut link_ptr) => {
                unsafe {
                    *link_ptr.as_mut() = Some(Node::create(parent, key, value));
                }
                self.num_nodes += 1;
                self.rebalance_once(parent);
                None
            }
        }
    }

    /// Returns a mutable reference to the value of the entry equivalent
    /// to the key, first inserting a default value if there is no such entry.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let node_ptr = match self.search(&key) {
            SearchResult::Occupied(node_ptr) => node_ptr,
            SearchResult::Vacant(parent, mut link_ptr) => {
                let node_ptr = Node::create(parent, key, V::default());
                unsafe {
                    *link_ptr.as_mut() = Some(node_ptr);
                }
                self.num_nodes += 1;
                self.rebalance_once(parent);
                node_ptr
            }
        };
        &mut unsafe { &mut *node_ptr.as_ptr() }.value
    }

    /// Removes the entry equivalent to the key from the map, if any.
    /// Returns the removed value, or `None` if there was no such entry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        // Find node to-be-removed
        let node_ptr = self.find_node(key)?;
        debug_assert!(self.num_nodes >= 1);
        self.unlink_node(node_ptr);
        let node = unsafe { Node::destroy(node_ptr) };
        self.num_nodes -= 1;
        debug_assert!(self.get(key).is_none());
        Some(node.value)
    }

    /// Returns an iterator positioned at the entry equivalent to the key
    /// and running to the end of the map, or an exhausted iterator if
    /// there is no such entry.
    pub fn find(&self, key: &K) -> Iter<'_, K, V> {
        match self.find_node(key) {
            Some(node_ptr) => Iter {
                front: Some(node_ptr),
                back: self.rightmost(),
                marker: PhantomData,
            },
            None => Iter {
                front: None,
                back: None,
                marker: PhantomData,
            },
        }
    }

    /// Returns an iterator over the entries equivalent to the key,
    /// scanning forward from the in-order first entry of the map.
    /// Since keys are unique the range holds at most one entry.
    pub fn equal_range(&self, key: &K) -> Range<'_, K, V> {
        // An empty map has no in-order first node to scan from.
        let mut lower = self.leftmost();
        while let Some(node_ptr) = lower {
            if self.cmp.less(&unsafe { node_ptr.as_ref() }.key, key) {
                lower = unsafe { Node::successor(node_ptr) };
            } else {
                break;
            }
        }
        let mut last = None;
        let mut upper = lower;
        while let Some(node_ptr) = upper {
            if self.cmp.less(key, &unsafe { node_ptr.as_ref() }.key) {
                break;
            }
            last = upper;
            upper = unsafe { Node::successor(node_ptr) };
        }
        match (lower, last) {
            (Some(front), Some(back)) => Range {
                front: Some(front),
                back: Some(back),
                marker: PhantomData,
            },
            _ => Range {
                front: None,
                back: None,
                marker: PhantomData,
            },
        }
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_node_ptr) = self.root {
                assert!(root_node_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let mut num_nodes = 0;
            self.preorder(|node_ptr| {
                let mut left_height = 0;
                let mut right_height = 0;

                // Check link for left child node
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(self.cmp.less(&left_ptr.as_ref().key, &node_ptr.as_ref().key));
                    left_height = left_ptr.as_ref().height;
                }

                // Check link for right child node
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(self.cmp.less(&node_ptr.as_ref().key, &right_ptr.as_ref().key));
                    right_height = right_ptr.as_ref().height;
                }

                // Check height
                assert_eq!(
                    node_ptr.as_ref().height,
                    1 + cmp::max(left_height, right_height)
                );

                // Check AVL condition (near balance)
                assert!(left_height <= right_height + 1);
                assert!(right_height <= left_height + 1);

                num_nodes += 1;
            });

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);
        }
    }

    fn find_node(&self, key: &K) -> Link<K, V> {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let node = unsafe { node_ptr.as_ref() };
            if self.cmp.less(key, &node.key) {
                current = node.left;
            } else if self.cmp.less(&node.key, key) {
                current = node.right;
            } else {
                break;
            }
        }
        current
    }

    /// Descends to the node equivalent to the key, or to the empty link
    /// where such a node would be inserted.
    fn search(&mut self, key: &K) -> SearchResult<K, V> {
        let mut parent: Link<K, V> = None;
        let mut link_ptr: LinkPtr<K, V> = unsafe { LinkPtr::new_unchecked(&mut self.root) };
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                if self.cmp.less(key, &node_ptr.as_ref().key) {
                    parent = *link_ptr.as_ref();
                    link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().left);
                } else if self.cmp.less(&node_ptr.as_ref().key, key) {
                    parent = *link_ptr.as_ref();
                    link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().right);
                } else {
                    return SearchResult::Occupied(node_ptr);
                }
            }
        }
        SearchResult::Vacant(parent, link_ptr)
    }
}

impl<K, V, C> Drop for AvlMap<K, V, C> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V, C: Default> Default for AvlMap<K, V, C> {
    /// Creates an empty map with a default comparator.
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for AvlMap<K, V, C> {
    /// Deep copies the map. Every node is allocated anew;
    /// the copy shares no structure with the original.
    fn clone(&self) -> Self {
        Self {
            root: self
                .root
                .map(|root_ptr| unsafe { Node::clone_subtree(root_ptr, None) }),
            num_nodes: self.num_nodes,
            cmp: self.cmp.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for AvlMap<K, V, C> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C> PartialEq for AvlMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for AvlMap<K, V, C> {}

impl<K, V, C> FromIterator<(K, V)> for AvlMap<K, V, C>
where
    C: Compare<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (key, value) in iter {
            map.insert_or_assign(key, value);
        }
        map
    }
}

impl<K, V, C: Compare<K>> Extend<(K, V)> for AvlMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert_or_assign(key, value);
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a AvlMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, C> IntoIterator for &'a mut AvlMap<K, V, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// Auto derived clone seems to have an invalid type bound of K: Clone, V: Clone
impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = unsafe { Node::successor(node_ptr) };
        }
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node_ptr = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = unsafe { Node::predecessor(node_ptr) };
        }
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = unsafe { Node::successor(node_ptr) };
        }
        let node = unsafe { &mut *node_ptr.as_ptr() };
        Some((&node.key, &mut node.value))
    }
}

impl<'a, K, V> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node_ptr = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = unsafe { Node::predecessor(node_ptr) };
        }
        let node = unsafe { &mut *node_ptr.as_ptr() };
        Some((&node.key, &mut node.value))
    }
}

// Auto derived clone seems to have an invalid type bound of K: Clone, V: Clone
impl<'a, K, V> Clone for Range<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = unsafe { Node::successor(node_ptr) };
        }
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> DoubleEndedIterator for Range<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node_ptr = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = unsafe { Node::predecessor(node_ptr) };
        }
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.value))
    }
}

impl<K, V> Node<K, V> {
    fn create(parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 1,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    unsafe fn destroy(node_ptr: NodePtr<K, V>) -> Node<K, V> {
        *Box::from_raw(node_ptr.as_ptr())
    }

    unsafe fn leftmost(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(left_ptr) = node_ptr.as_ref().left {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    unsafe fn rightmost(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(right_ptr) = node_ptr.as_ref().right {
            node_ptr = right_ptr;
        }
        node_ptr
    }

    /// Steps to the in-order successor: the leftmost node of the right
    /// sub tree if there is one, otherwise the first ancestor reached
    /// by ascending from a left child.
    unsafe fn successor(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        if let Some(right_ptr) = node_ptr.as_ref().right {
            return Some(Self::leftmost(right_ptr));
        }
        let mut child_ptr = node_ptr;
        let mut parent = node_ptr.as_ref().parent;
        while let Some(parent_ptr) = parent {
            if parent_ptr.as_ref().left == Some(child_ptr) {
                return Some(parent_ptr);
            }
            child_ptr = parent_ptr;
            parent = parent_ptr.as_ref().parent;
        }
        None
    }

    /// Steps to the in-order predecessor, mirroring `successor`.
    unsafe fn predecessor(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        if let Some(left_ptr) = node_ptr.as_ref().left {
            return Some(Self::rightmost(left_ptr));
        }
        let mut child_ptr = node_ptr;
        let mut parent = node_ptr.as_ref().parent;
        while let Some(parent_ptr) = parent {
            if parent_ptr.as_ref().right == Some(child_ptr) {
                return Some(parent_ptr);
            }
            child_ptr = parent_ptr;
            parent = parent_ptr.as_ref().parent;
        }
        None
    }
}

impl<K: Clone, V: Clone> Node<K, V> {
    unsafe fn clone_subtree(node_ptr: NodePtr<K, V>, parent: Link<K, V>) -> NodePtr<K, V> {
        let node = node_ptr.as_ref();
        let mut new_ptr = Node::create(parent, node.key.clone(), node.value.clone());
        new_ptr.as_mut().height = node.height;
        if let Some(left_ptr) = node.left {
            new_ptr.as_mut().left = Some(Self::clone_subtree(left_ptr, Some(new_ptr)));
        }
        if let Some(right_ptr) = node.right {
            new_ptr.as_mut().right = Some(Self::clone_subtree(right_ptr, Some(new_ptr)));
        }
        new_ptr
    }
}
