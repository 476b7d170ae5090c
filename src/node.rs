//! Node classification
//!
//! Every operation needs to know what a path denotes before touching
//! it. The probe is a single SELECT: a rejected SELECT means no folder
//! exists there, an empty folder is a directory, and a folder with
//! messages is a file (its first message is the content). The
//! interpretation lives here and nowhere else.

use crate::error::Result;
use crate::path::ResolvedName;
use crate::session::StoreSession;

/// What a path denotes at the instant it was probed.
///
/// Nothing is cached, so two probes of the same path may disagree if
/// the remote store changed in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A folder with zero stored messages; maps to a directory.
    Container,
    /// A folder holding at least one stored message; maps to a file
    /// whose content is the payload of the message at position one.
    Leaf,
    /// No folder at this name.
    Absent,
}

impl NodeKind {
    #[must_use]
    pub const fn exists(self) -> bool {
        !matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Container)
    }

    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Self::Leaf)
    }
}

/// Classify the node at `name` with a fresh SELECT probe.
///
/// A `No`/`Bad` status is a normal outcome (the folder does not
/// exist); only transport faults surface as errors. On `Container` and
/// `Leaf` the probed folder is left selected on the session, which the
/// read path relies on to fetch message one without a second SELECT.
///
/// # Errors
///
/// Returns an error if the session fails below the protocol level.
pub async fn classify(session: &mut StoreSession<'_>, name: &ResolvedName) -> Result<NodeKind> {
    let kind = match session.select(name).await? {
        None => NodeKind::Absent,
        Some(0) => NodeKind::Container,
        Some(_) => NodeKind::Leaf,
    };
    Ok(kind)
}
