//! Error Types
//!
//! This module defines the error types produced while building a rendering
//! graph.
//!
//! # Overview
//!
//! Every failure is fatal to the current build attempt, never to the process.
//! The builder returns before handing out any graph, so a caller that receives
//! an error keeps its previous graph (or stops rendering) and retries after
//! correcting its configuration.
//!
//! Errors fall into three categories, see [`ErrorKind`]:
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | `Configuration` | zero CSM cascades, unknown subscene kind, zero or several sinks |
//! | `ResourceLegality` | a sampled depth input would have to be a renderbuffer |
//! | `InvariantViolation` | cloning an allocated slink, stale subscene ids, cycles |
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_scenegraph::errors::{GraphError, Result};
//!
//! fn rebuild() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Broad category of a [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested pipeline configuration cannot be assembled.
    Configuration,
    /// A resource would be bound in a way the GPU cannot honour.
    ResourceLegality,
    /// Internal graph invariants were broken by the caller or a builder bug.
    InvariantViolation,
}

/// The error type for rendering graph construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Shadows were requested with zero cascaded shadow map sections.
    #[error("Zero CSM sections is forbidden")]
    ZeroCascades,

    /// A subscene kind name could not be parsed.
    #[error("Unknown subscene kind: {0}")]
    UnknownSubsceneKind(String),

    /// The assembled graph has no terminal subscene.
    #[error("No sink subscene")]
    NoSink,

    /// The assembled graph has more than one terminal subscene.
    #[error("Rendering graph is corrupted: {0} sink subscenes")]
    MultipleSinks(usize),

    // ========================================================================
    // Resource Legality Errors
    // ========================================================================
    /// A depth link that must stay a renderbuffer is sampled downstream.
    #[error("Failed to use renderbuffer as input texture: {from}->{to}")]
    RenderbufferSampled {
        /// Source semantic of the offending slink
        from: String,
        /// Destination binding of the offending slink
        to: String,
    },

    // ========================================================================
    // Invariant Violations
    // ========================================================================
    /// A slink was cloned after a texture had been assigned to it.
    #[error("Failed to clone slink with attached texture")]
    CloneAttachedSlink,

    /// A query referenced a subscene that is not part of the graph.
    #[error("Subscene not in graph")]
    SubsceneNotInGraph,

    /// The graph could not be sorted topologically.
    #[error("Rendering graph contains a cycle")]
    Cycle,
}

impl GraphError {
    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroCascades
            | Self::UnknownSubsceneKind(_)
            | Self::NoSink
            | Self::MultipleSinks(_) => ErrorKind::Configuration,
            Self::RenderbufferSampled { .. } => ErrorKind::ResourceLegality,
            Self::CloneAttachedSlink | Self::SubsceneNotInGraph | Self::Cycle => {
                ErrorKind::InvariantViolation
            }
        }
    }
}

/// Alias for `Result<T, GraphError>`.
pub type Result<T> = std::result::Result<T, GraphError>;
