use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Deadline applied to each outbound heartbeat unless the configuration
/// overrides it.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Network endpoint of a replica-set member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostAndPort {
    host: String,
    port: u16,
}

impl HostAndPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for HostAndPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A single member entry of a replica-set configuration.
///
/// Members vote and are electable by default; the chained setters opt out.
/// A member that cannot vote is never electable, whatever its electable flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConfig {
    id: u64,
    endpoint: HostAndPort,
    voter: bool,
    electable: bool,
}

impl MemberConfig {
    pub fn new(id: u64, endpoint: HostAndPort) -> Self {
        Self {
            id,
            endpoint,
            voter: true,
            electable: true,
        }
    }

    pub fn voting(mut self, voting: bool) -> Self {
        self.voter = voting;
        self
    }

    pub fn electable(mut self, electable: bool) -> Self {
        self.electable = electable;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn endpoint(&self) -> &HostAndPort {
        &self.endpoint
    }

    pub fn is_voter(&self) -> bool {
        self.voter
    }

    pub fn is_electable(&self) -> bool {
        self.voter && self.electable
    }
}

/// Candidate replica-set configuration, immutable for the duration of a
/// quorum check.
///
/// Full configuration parsing and validation live with the caller; the checks
/// here are only the structural ones the quorum arithmetic depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSetConfig {
    set_name: String,
    version: u64,
    members: Vec<MemberConfig>,
    heartbeat_timeout: Duration,
}

impl ReplicaSetConfig {
    pub fn new(
        set_name: impl Into<String>,
        version: u64,
        members: Vec<MemberConfig>,
    ) -> Result<Self, ConfigError> {
        if version == 0 {
            return Err(ConfigError::InvalidVersion(version));
        }
        if members.is_empty() {
            return Err(ConfigError::NoMembers);
        }
        for (idx, member) in members.iter().enumerate() {
            for earlier in &members[..idx] {
                if earlier.id() == member.id() {
                    return Err(ConfigError::DuplicateMemberId(member.id()));
                }
                if earlier.endpoint() == member.endpoint() {
                    return Err(ConfigError::DuplicateEndpoint(member.endpoint().clone()));
                }
            }
        }
        if !members.iter().any(MemberConfig::is_voter) {
            return Err(ConfigError::NoVoters);
        }
        Ok(Self {
            set_name: set_name.into(),
            version,
            members,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        })
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn members(&self) -> &[MemberConfig] {
        &self.members
    }

    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    pub fn member_at(&self, index: usize) -> &MemberConfig {
        &self.members[index]
    }

    pub fn member_by_endpoint(&self, endpoint: &HostAndPort) -> Option<&MemberConfig> {
        self.members
            .iter()
            .find(|member| member.endpoint() == endpoint)
    }

    pub fn voter_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_voter()).count()
    }

    /// Number of affirmative voter responses that constitutes a majority.
    pub fn majority_vote_count(&self) -> usize {
        self.voter_count() / 2 + 1
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("replica set configuration must list at least one member")]
    NoMembers,

    #[error("replica set configuration version must be at least 1, got {0}")]
    InvalidVersion(u64),

    #[error("duplicate member id {0}")]
    DuplicateMemberId(u64),

    #[error("duplicate member endpoint {0}")]
    DuplicateEndpoint(HostAndPort),

    #[error("replica set configuration must include at least one voting member")]
    NoVoters,
}
