//! Error type shared by the handle API and the object facade.

/// Everything that can go wrong at the public surface.
///
/// The `Display` output of each variant is part of the API contract: callers
/// match on these strings across language boundaries.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A parameter failed validation. State is left unchanged.
    #[error("bad argument to #{index} '{name}': {reason}")]
    BadArgument {
        index: usize,
        name: &'static str,
        reason: String,
    },

    #[error("world {0} does not exist")]
    WorldNotFound(u32),

    #[error("body {body} does not exist in world {world}")]
    BodyNotFound { body: u32, world: u32 },

    #[error("material {0} does not exist")]
    MaterialNotFound(String),

    #[error("polygon {0} does not exist")]
    PolygonNotFound(String),

    /// Destroy on handle 0 or on a handle that was already destroyed.
    #[error("{what} {id} already destroyed")]
    AlreadyDestroyed { what: &'static str, id: u32 },
}

impl Error {
    pub(crate) fn bad_argument(
        index: usize,
        name: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Error::BadArgument {
            index,
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
