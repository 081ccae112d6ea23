use std::fmt::Debug;
use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{0}")]
    /// An IO error has occurred,
    IO(#[from] io::Error),

    #[error("Invalid connection config: {0}")]
    /// The connection config cannot be used to start the node.
    Config(String),
}
