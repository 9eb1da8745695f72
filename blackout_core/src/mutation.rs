// Copyright 2026 the Blackout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutation records and the added-node relevance filter.
//!
//! Hosts translate their change notifications (a `MutationObserver` batch in
//! a browser, the [`Document`](crate::document::Document) log in tests) into
//! [`MutationRecord`]s. Only child-list records with added nodes can bring in
//! new media; removals and attribute changes are ignored.

use alloc::vec::Vec;

use crate::classify::Classifier;
use crate::dom::ElementTree;

/// What kind of change a [`MutationRecord`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Children were added to or removed from `target`.
    ChildList,
    /// An attribute of `target` changed.
    Attributes,
    /// Text content of `target` changed.
    CharacterData,
}

/// One observed change.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationRecord<N> {
    /// What changed.
    pub kind: MutationKind,
    /// The node the change happened on (the parent, for child-list changes).
    pub target: N,
    /// Nodes inserted under `target`.
    pub added: Vec<N>,
    /// Nodes removed from `target`.
    pub removed: Vec<N>,
}

impl<N> MutationRecord<N> {
    /// A child-list record.
    #[must_use]
    pub fn child_list(target: N, added: Vec<N>, removed: Vec<N>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added,
            removed,
        }
    }

    /// An attribute-change record.
    #[must_use]
    pub fn attributes(target: N) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Returns the added nodes if this is a child-list record.
    #[must_use]
    pub fn added_nodes(&self) -> &[N] {
        match self.kind {
            MutationKind::ChildList => &self.added,
            MutationKind::Attributes | MutationKind::CharacterData => &[],
        }
    }
}

/// Returns whether any node added in `records` is, or contains, a photo
/// container, a video container, or a post wrapper.
///
/// Added nodes that have since been detached from `tree` are still inspected;
/// their subtree is whatever the tree reports for them now.
#[must_use]
pub fn batch_is_relevant<T: ElementTree + ?Sized>(
    classifier: &Classifier,
    tree: &T,
    records: &[MutationRecord<T::Node>],
) -> bool {
    records
        .iter()
        .flat_map(MutationRecord::added_nodes)
        .any(|node| classifier.holds_tracked_container(tree, node))
}

/// Counts added nodes across a batch (all kinds of node).
#[must_use]
pub fn added_count<N>(records: &[MutationRecord<N>]) -> usize {
    records.iter().map(|r| r.added_nodes().len()).sum()
}
