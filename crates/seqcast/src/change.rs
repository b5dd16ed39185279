#![forbid(unsafe_code)]

//! Structured change events.
//!
//! # Index conventions
//!
//! | Variant     | `index` refers to                                   |
//! |-------------|-----------------------------------------------------|
//! | `Remove`    | position before the removal                         |
//! | `Insert`    | position after the insertion                        |
//! | `Move`      | both positions; elements as they were before swap   |
//! | `Composite` | children carry their own indices                    |
//!
//! Composite children are not re-indexed against each other. A composite of
//! removals produced by clearing the sequence lists every original position
//! (`0, 1, 2, ..`), not the shifting position at which each element would be
//! removed one by one.

/// Fieldless discriminant of a [`ChangeEvent`], for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Remove,
    Insert,
    Move,
    Composite,
}

impl ChangeKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Insert => "insert",
            Self::Move => "move",
            Self::Composite => "composite",
        }
    }
}

/// A description of one change to an observable sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeEvent<T> {
    /// `element` was removed from `index`.
    Remove { index: usize, element: T },
    /// `element` now sits at `index`.
    Insert { index: usize, element: T },
    /// The elements at `source_index` and `dest_index` were exchanged.
    Move {
        source_index: usize,
        dest_index: usize,
        source_element: T,
        dest_element: T,
    },
    /// Several changes produced by one logical operation.
    Composite(Vec<ChangeEvent<T>>),
}

impl<T> ChangeEvent<T> {
    #[must_use]
    pub fn remove(index: usize, element: T) -> Self {
        Self::Remove { index, element }
    }

    #[must_use]
    pub fn insert(index: usize, element: T) -> Self {
        Self::Insert { index, element }
    }

    #[must_use]
    pub fn moved(source_index: usize, dest_index: usize, source_element: T, dest_element: T) -> Self {
        Self::Move {
            source_index,
            dest_index,
            source_element,
            dest_element,
        }
    }

    #[must_use]
    pub fn composite(events: impl IntoIterator<Item = ChangeEvent<T>>) -> Self {
        Self::Composite(events.into_iter().collect())
    }

    /// Index of a `Remove` or `Insert`; `None` for `Move` and `Composite`.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Remove { index, .. } | Self::Insert { index, .. } => Some(*index),
            Self::Move { .. } | Self::Composite(_) => None,
        }
    }

    /// Element of a `Remove` or `Insert`; `None` for `Move` and `Composite`.
    #[must_use]
    pub fn element(&self) -> Option<&T> {
        match self {
            Self::Remove { element, .. } | Self::Insert { element, .. } => Some(element),
            Self::Move { .. } | Self::Composite(_) => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Remove { .. } => ChangeKind::Remove,
            Self::Insert { .. } => ChangeKind::Insert,
            Self::Move { .. } => ChangeKind::Move,
            Self::Composite(_) => ChangeKind::Composite,
        }
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// Direct children of a `Composite`; empty for every other variant.
    #[must_use]
    pub fn children(&self) -> &[ChangeEvent<T>] {
        match self {
            Self::Composite(children) => children,
            _ => &[],
        }
    }

    /// Depth-first iterator over every non-composite event, in order.
    pub fn leaves(&self) -> Leaves<'_, T> {
        Leaves { stack: vec![self] }
    }

    /// Number of non-composite events.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Transform every element, keeping variants and indices.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ChangeEvent<U> {
        self.map_with(&mut f)
    }

    fn map_with<U, F: FnMut(T) -> U>(self, f: &mut F) -> ChangeEvent<U> {
        match self {
            Self::Remove { index, element } => ChangeEvent::Remove {
                index,
                element: f(element),
            },
            Self::Insert { index, element } => ChangeEvent::Insert {
                index,
                element: f(element),
            },
            Self::Move {
                source_index,
                dest_index,
                source_element,
                dest_element,
            } => ChangeEvent::Move {
                source_index,
                dest_index,
                source_element: f(source_element),
                dest_element: f(dest_element),
            },
            Self::Composite(children) => {
                ChangeEvent::Composite(children.into_iter().map(|c| c.map_with(&mut *f)).collect())
            }
        }
    }
}

/// Iterator returned by [`ChangeEvent::leaves`].
#[derive(Debug)]
pub struct Leaves<'a, T> {
    stack: Vec<&'a ChangeEvent<T>>,
}

impl<'a, T> Iterator for Leaves<'a, T> {
    type Item = &'a ChangeEvent<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(event) = self.stack.pop() {
            match event {
                ChangeEvent::Composite(children) => self.stack.extend(children.iter().rev()),
                leaf => return Some(leaf),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_only_for_remove_and_insert() {
        let remove = ChangeEvent::remove(1, "b");
        assert_eq!(remove.index(), Some(1));
        assert_eq!(remove.element(), Some(&"b"));

        let insert = ChangeEvent::insert(0, "x");
        assert_eq!(insert.index(), Some(0));
        assert_eq!(insert.element(), Some(&"x"));

        let mv = ChangeEvent::moved(0, 1, "a", "b");
        assert_eq!(mv.index(), None);
        assert_eq!(mv.element(), None);

        let composite = ChangeEvent::composite([ChangeEvent::insert(0, "x")]);
        assert_eq!(composite.index(), None);
        assert_eq!(composite.element(), None);
    }

    #[test]
    fn kind_names() {
        assert_eq!(ChangeEvent::remove(0, 1).kind().as_str(), "remove");
        assert_eq!(ChangeEvent::insert(0, 1).kind().as_str(), "insert");
        assert_eq!(ChangeEvent::moved(0, 1, 1, 2).kind().as_str(), "move");
        assert_eq!(ChangeEvent::<u8>::composite([]).kind().as_str(), "composite");
    }

    #[test]
    fn children_of_leaf_is_empty() {
        let leaf = ChangeEvent::insert(0, 'a');
        assert!(leaf.children().is_empty());
        assert!(!leaf.is_composite());
    }

    #[test]
    fn leaves_flatten_in_order() {
        let event = ChangeEvent::composite([
            ChangeEvent::remove(0, 'a'),
            ChangeEvent::composite([ChangeEvent::insert(0, 'x'), ChangeEvent::insert(1, 'y')]),
            ChangeEvent::moved(0, 1, 'x', 'y'),
        ]);
        let kinds: Vec<_> = event.leaves().map(ChangeEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Remove,
                ChangeKind::Insert,
                ChangeKind::Insert,
                ChangeKind::Move
            ]
        );
        assert_eq!(event.leaf_count(), 4);
        assert_eq!(event.children().len(), 3);
    }

    #[test]
    fn empty_composite_has_no_leaves() {
        let event = ChangeEvent::<u8>::composite([]);
        assert_eq!(event.leaf_count(), 0);
    }

    #[test]
    fn map_keeps_shape() {
        let event = ChangeEvent::composite([
            ChangeEvent::remove(2, 1),
            ChangeEvent::moved(0, 3, 4, 5),
        ]);
        let mapped = event.map(|n| n * 10);
        assert_eq!(
            mapped,
            ChangeEvent::composite([
                ChangeEvent::remove(2, 10),
                ChangeEvent::moved(0, 3, 40, 50),
            ])
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_json_shape() {
        let event = ChangeEvent::composite([ChangeEvent::insert(0, "x".to_string())]);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"Composite":[{"Insert":{"index":0,"element":"x"}}]}"#);
        let back: ChangeEvent<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
