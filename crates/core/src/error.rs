use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Only `.txt`, `.href` and `.torrent` files can be served.
    #[error("unsupported file type: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("parent directory {parent} not registered for {}", .path.display())]
    MissingParent { path: PathBuf, parent: String },

    #[error("cannot derive a chain from an empty path")]
    EmptyChain,

    #[error("list entry is {len} bytes, limit is {max}: {entry}")]
    ItemTooLarge { entry: String, len: usize, max: usize },

    #[error("name {0:?} contains a reserved character")]
    ReservedCharacter(String),

    #[error("malformed torrent {}: {reason}", .path.display())]
    Torrent { path: PathBuf, reason: String },

    #[error("malformed item content: {0:?}")]
    MalformedContent(String),

    #[error("protocol message is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("cannot parse resolv.conf: {0}")]
    ResolvConf(#[from] resolv_conf::ParseError),

    #[error("dns protocol error: {0}")]
    Proto(#[from] hickory_proto::error::ProtoError),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("server answered {0}")]
    ResponseCode(String),

    #[error("no such resource: {0}")]
    NotFound(String),

    #[error("{0} did not answer with server info")]
    NoServerInfo(String),

    #[error("folder listing incomplete: expected {expected} items, got {got}")]
    IncompleteListing { expected: usize, got: usize },
}
