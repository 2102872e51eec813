//! Error types for configuration loading. Transport-level failures are not
//! part of this taxonomy: per the protocol's design, they are logged and
//! swallowed at the point of occurrence rather than propagated (see
//! `transport::TransportError`).

use thiserror::Error;

/// A fatal problem with the council's configuration file. Any of these
/// aborts the process before a single member is constructed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path:?} as JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("member {id:?} has unknown role {role:?} (expected PROPOSER or ACCEPTOR)")]
    UnknownRole { id: String, role: String },

    #[error("duplicate member id {id:?}")]
    DuplicateId { id: String },

    #[error("duplicate port {port} (used by {first:?} and {second:?})")]
    DuplicatePort {
        port: u16,
        first: String,
        second: String,
    },

    #[error("member {id:?} has invalid port {port} (expected 1-65535)")]
    InvalidPort { id: String, port: u32 },

    #[error("empty member list: a council needs at least one member")]
    Empty,
}
