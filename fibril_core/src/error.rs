// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-phase errors.

use alloc::string::String;

use crate::fiber::RootId;

/// An error that aborts a render pass.
///
/// A render that fails leaves the committed tree untouched: the partially
/// built work-in-progress tree is discarded and no output mutation happens.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A component called a different number of hooks than on its previous
    /// render.
    #[error("component rendered {found} hooks, previous render had {expected}")]
    HookCountMismatch {
        /// Number of hooks on the previous render.
        expected: usize,
        /// Number of hooks reached on this render.
        found: usize,
    },
    /// The hook at `index` is of a different kind (or state type) than the
    /// one recorded at the same position on the previous render.
    #[error("hook {index} changed kind between renders")]
    HookKindMismatch {
        /// Position of the offending hook in the call order.
        index: usize,
    },
    /// A hook was called without a component render in progress.
    #[error("hook called outside of a component render")]
    HookOutsideComponent,
    /// A component render function reported a failure.
    #[error("component failed to render: {0}")]
    Component(String),
    /// Updates kept scheduling further synchronous renders past the limit.
    #[error("exceeded {limit} nested synchronous renders")]
    NestedUpdateLimit {
        /// The configured limit that was reached.
        limit: u32,
    },
    /// The root handle does not belong to this reconciler.
    #[error("unknown root {0:?}")]
    UnknownRoot(RootId),
}
