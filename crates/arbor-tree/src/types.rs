//! Common types for the tree implementations.

/// Strict weak ordering over keys.
///
/// Two keys are equivalent when neither is less than the other. Both trees
/// locate keys by equivalence, never by `==`.
pub trait KeyComparator<K: ?Sized> {
    /// Returns true if `a` sorts strictly before `b`.
    fn less(&self, a: &K, b: &K) -> bool;

    /// Returns true if neither key sorts before the other.
    #[inline]
    fn equivalent(&self, a: &K, b: &K) -> bool {
        !self.less(a, b) && !self.less(b, a)
    }
}

/// Orders keys by their `Ord` implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> KeyComparator<K> for NaturalOrder {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

/// Orders keys with a caller-supplied "less than" closure.
///
/// ```
/// use arbor_tree::{BTree, OrderBy};
///
/// let mut tree = BTree::with_comparator(2, OrderBy(|a: &u32, b: &u32| a > b)).unwrap();
/// tree.insert(1);
/// tree.insert(3);
/// tree.insert(2);
/// assert_eq!(tree.keys(), vec![&3, &2, &1]);
/// ```
#[derive(Clone, Copy)]
pub struct OrderBy<F>(pub F);

impl<K: ?Sized, F> KeyComparator<K> for OrderBy<F>
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        (self.0)(a, b)
    }
}

/// Renders a key for error messages and tree dumps.
pub type KeyFormatter<K> = fn(&K) -> String;

/// Outcome of fixing an underfull child during a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rebalance {
    /// The child already had enough keys.
    Unchanged,
    /// Keys moved between siblings or two siblings merged.
    Modified,
    /// A merge emptied the root and its only child took its place.
    NewRoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        assert!(NaturalOrder.less(&1, &2));
        assert!(!NaturalOrder.less(&2, &2));
        assert!(NaturalOrder.equivalent(&2, &2));
        assert!(NaturalOrder.less("apple", "banana"));
    }

    #[test]
    fn test_order_by_reverses() {
        let reverse = OrderBy(|a: &i32, b: &i32| a > b);
        assert!(reverse.less(&5, &1));
        assert!(!reverse.less(&1, &5));
        assert!(reverse.equivalent(&3, &3));
    }

    #[test]
    fn test_equivalence_ignores_unordered_fields() {
        let by_len = OrderBy(|a: &String, b: &String| a.len() < b.len());
        assert!(by_len.equivalent(&"abc".to_string(), &"xyz".to_string()));
        assert!(by_len.less(&"ab".to_string(), &"xyz".to_string()));
    }
}
