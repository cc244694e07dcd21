//! Static cluster configuration: who the replicas are and where each one serves peer RPCs.
//!
//! The file is line oriented, one `<replicaId> <host>[:<port>]` per line. Blank lines are ignored.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

pub const DEFAULT_PEER_PORT: u16 = 1099;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberInfo {
    pub replica_id: String,
    pub host: String,
    pub peer_port: u16,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterConfig {
    pub cluster_members: Vec<MemberInfo>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read cluster config '{path}'")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Line {line_number}: expected '<replicaId> <host>[:<port>]', found {num_tokens} token(s)")]
    WrongTokenCount { line_number: usize, num_tokens: usize },
    #[error("Line {line_number}: invalid address '{address}'")]
    BadAddress { line_number: usize, address: String },
    #[error("Line {line_number}: replica '{replica_id}' is configured twice")]
    DuplicateReplica { line_number: usize, replica_id: String },
    #[error("Cluster config has no replicas")]
    Empty,
    #[error("Replica '{0}' is not in the cluster config")]
    UnknownReplica(String),
}

impl ClusterConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Unreadable {
            path: path.as_ref().display().to_string(),
            source,
        })?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut cluster_members = Vec::new();
        let mut seen = HashSet::new();

        for (i, line) in contents.lines().enumerate() {
            let line_number = i + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() != 2 {
                return Err(ConfigError::WrongTokenCount {
                    line_number,
                    num_tokens: tokens.len(),
                });
            }

            let replica_id = tokens[0].to_string();
            let (host, peer_port) = parse_address(tokens[1]).ok_or_else(|| ConfigError::BadAddress {
                line_number,
                address: tokens[1].to_string(),
            })?;

            if !seen.insert(replica_id.clone()) {
                return Err(ConfigError::DuplicateReplica {
                    line_number,
                    replica_id,
                });
            }

            cluster_members.push(MemberInfo {
                replica_id,
                host,
                peer_port,
            });
        }

        if cluster_members.is_empty() {
            return Err(ConfigError::Empty);
        }

        Ok(ClusterConfig { cluster_members })
    }

    pub fn member(&self, replica_id: &str) -> Result<&MemberInfo, ConfigError> {
        self.cluster_members
            .iter()
            .find(|member| member.replica_id == replica_id)
            .ok_or_else(|| ConfigError::UnknownReplica(replica_id.to_string()))
    }
}

fn parse_address(address: &str) -> Option<(String, u16)> {
    let (host, port) = match address.rfind(':') {
        Some(i) => {
            let port = address[i + 1..].parse::<u16>().ok()?;
            (&address[..i], port)
        }
        None => (address, DEFAULT_PEER_PORT),
    };

    if host.is_empty() || port == 0 {
        return None;
    }
    Some((host.to_string(), port))
}
