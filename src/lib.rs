//! An ordered map implemented with an AVL tree.
//!
//! [`AvlMap`] keeps its entries sorted by a strict weak ordering
//! supplied at construction, defaulting to the natural ordering of the
//! key type. Lookup, insertion and removal run in O(log n) time;
//! iteration is bidirectional and visits entries in key order.
//!
//! ```
//! use avlmap::AvlMap;
//!
//! let mut map = AvlMap::new();
//! map.insert_or_assign(2, "two");
//! map.insert_or_assign(1, "one");
//! map.insert_or_assign(3, "three");
//! assert_eq!(map.get(&2), Some(&"two"));
//!
//! for (k, v) in &map {
//!     println!("{k} => {v}");
//! }
//!
//! map.remove(&2);
//! assert!(map.get(&2).is_none());
//! ```
//!
//! A custom ordering is any type implementing [`Compare`], including
//! plain closures:
//!
//! ```
//! use avlmap::AvlMap;
//!
//! let mut map = AvlMap::with_comparator(|a: &i32, b: &i32| b < a);
//! map.insert_or_assign(1, "one");
//! map.insert_or_assign(2, "two");
//! let keys: Vec<i32> = map.iter().map(|(k, _)| *k).collect();
//! assert_eq!(keys, [2, 1]);
//! ```

mod map;

pub use map::{AvlMap, Compare, Iter, IterMut, KeyNotFound, NaturalOrder, Range};
