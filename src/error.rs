use std::path::PathBuf;

use thiserror::Error;

/// Failure of one of the remote reads (contest, contestant list, identity/profile).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The store answered with an empty result where one row was expected.
    #[error("{0} not found")]
    NotFound(String),

    #[error("remote call failed: {0}")]
    Remote(String),

    /// A row came back but did not match the expected wire shape.
    #[error("malformed record: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a photo before submitting")]
    NoFileSelected,
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote "add contestant" call rejected the entry. The cause is not classified.
    #[error("Submission failed")]
    Rejected(String),
}
