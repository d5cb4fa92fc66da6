// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutation flags recorded on fibers during render and consumed by commit.

use bitflags::bitflags;

bitflags! {
    /// Pending output mutations for a single fiber.
    ///
    /// A fiber's own flags describe work on that fiber; its subtree flags are
    /// the union of every descendant's flags and let commit skip clean
    /// subtrees.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        /// The fiber's output must be inserted (new or moved).
        const PLACEMENT = 1 << 0;
        /// The fiber's host attributes or text changed.
        const UPDATE = 1 << 1;
        /// Some former children must be removed.
        const CHILD_DELETION = 1 << 2;
        /// The fiber has passive effects to run after commit.
        const PASSIVE_EFFECT = 1 << 3;

        /// Flags handled by the commit mutation pass.
        const MUTATION_MASK = Self::PLACEMENT.bits()
            | Self::UPDATE.bits()
            | Self::CHILD_DELETION.bits()
            | Self::PASSIVE_EFFECT.bits();
    }
}

bitflags! {
    /// Tag bits on an effect hook record.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HookFlags: u8 {
        /// The effect is a passive (post-commit) effect. Cleared once the
        /// owning component unmounts and its cleanup has run.
        const PASSIVE = 1 << 0;
        /// Dependencies changed; the effect must re-run on this commit.
        const HAS_EFFECT = 1 << 1;
    }
}
