//! Loads and validates the council's member list from a JSON config file.
//!
//! The on-disk format is a JSON array of member descriptors; see
//! `MemberDescriptor` for the fields. Validation happens entirely in
//! `load_config`, before any member is constructed, so a malformed config
//! is a fatal, pre-flight error rather than something discovered mid-run.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A sentinel `responseDelay` that marks a proposer as permanently silent
/// after its first PREPARE.
pub const SILENT_PROPOSER_DELAY_MS: u64 = 12345;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Proposer,
    Acceptor,
}

impl Role {
    fn parse(raw: &str) -> Option<Role> {
        match raw.to_ascii_uppercase().as_str() {
            "PROPOSER" => Some(Role::Proposer),
            "ACCEPTOR" => Some(Role::Acceptor),
            _ => None,
        }
    }
}

/// The raw shape of one array element in the config file, deserialized
/// before role validation (so we can report the original, unrecognized
/// string on an unknown role).
#[derive(Debug, Deserialize)]
struct RawMemberDescriptor {
    id: String,
    role: String,
    #[serde(rename = "responseDelay")]
    response_delay: u64,
    port: u16,
}

/// One validated entry from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    pub id: String,
    pub role: Role,
    pub response_delay_ms: u64,
    pub port: u16,
}

impl MemberDescriptor {
    /// A proposer configured with `responseDelay == 12345` goes silent
    /// after its first PREPARE: it ignores every inbound message.
    pub fn is_silent_proposer(&self) -> bool {
        self.role == Role::Proposer && self.response_delay_ms == SILENT_PROPOSER_DELAY_MS
    }
}

/// Reads, parses and validates the config file at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<Vec<MemberDescriptor>, ConfigError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path_str.clone(),
        source,
    })?;

    let raw: Vec<RawMemberDescriptor> =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path_str.clone(),
            source,
        })?;

    validate(raw)
}

fn validate(raw: Vec<RawMemberDescriptor>) -> Result<Vec<MemberDescriptor>, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::Empty);
    }

    let mut seen_ids = HashSet::new();
    let mut seen_ports: Vec<(u16, String)> = Vec::new();
    let mut members = Vec::with_capacity(raw.len());

    for entry in raw {
        let role = Role::parse(&entry.role).ok_or_else(|| ConfigError::UnknownRole {
            id: entry.id.clone(),
            role: entry.role.clone(),
        })?;

        if !seen_ids.insert(entry.id.clone()) {
            return Err(ConfigError::DuplicateId { id: entry.id });
        }

        if entry.port == 0 {
            return Err(ConfigError::InvalidPort {
                id: entry.id,
                port: entry.port as u32,
            });
        }

        if let Some((_, first)) = seen_ports.iter().find(|(port, _)| *port == entry.port) {
            return Err(ConfigError::DuplicatePort {
                port: entry.port,
                first: first.clone(),
                second: entry.id,
            });
        }
        seen_ports.push((entry.port, entry.id.clone()));

        members.push(MemberDescriptor {
            id: entry.id,
            role,
            response_delay_ms: entry.response_delay,
            port: entry.port,
        });
    }

    Ok(members)
}
