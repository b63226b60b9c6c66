use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("failed to prepare inbox directory {path}: {source}")]
    PrepareRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
