use crate::config::{HostAndPort, ReplicaSetConfig};
use crate::executor::{RemoteCommandRequest, RemoteCommandResult, RemoteExecutor};
use crate::heartbeat::{HeartbeatRequest, HeartbeatResponse, HEARTBEAT_PROTOCOL_VERSION};
use crate::scatter_gather::{ScatterGatherAlgorithm, ScatterGatherError, ScatterGatherRunner};
use log::warn;
use thiserror::Error;

/// Verdict of a quorum check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuorumCheckError {
    #[error("our set name did not match that of {target}")]
    SetNameMismatch { target: HostAndPort },

    #[error(
        "our config version of {ours} is no larger than the version on {target}, which is {theirs}"
    )]
    ConfigVersionStale {
        target: HostAndPort,
        ours: u64,
        theirs: i64,
    },

    #[error(
        "could not contact the following nodes during replica set initiation: {}",
        join_endpoints(.down)
    )]
    UnreachableAtInitiate { down: Vec<HostAndPort> },

    #[error("no electable nodes responded; at least one required for config")]
    NoElectableResponded,

    #[error(
        "not enough voting nodes responded; required {required} but {}",
        describe_responders(.responded)
    )]
    VoterMajorityNotMet {
        required: usize,
        responded: Vec<HostAndPort>,
    },

    #[error("quorum check canceled")]
    Canceled,
}

/// Operator-facing grouping of the verdict variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumCheckErrorKind {
    ConfigurationIncompatible,
    NodeNotFound,
    Canceled,
}

impl QuorumCheckError {
    pub fn kind(&self) -> QuorumCheckErrorKind {
        match self {
            Self::SetNameMismatch { .. } | Self::ConfigVersionStale { .. } => {
                QuorumCheckErrorKind::ConfigurationIncompatible
            }
            Self::UnreachableAtInitiate { .. }
            | Self::NoElectableResponded
            | Self::VoterMajorityNotMet { .. } => QuorumCheckErrorKind::NodeNotFound,
            Self::Canceled => QuorumCheckErrorKind::Canceled,
        }
    }
}

fn join_endpoints(endpoints: &[HostAndPort]) -> String {
    endpoints
        .iter()
        .map(HostAndPort::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_responders(responded: &[HostAndPort]) -> String {
    if responded.is_empty() {
        "none responded".to_string()
    } else {
        format!(
            "only the following {} voting nodes responded: {}",
            responded.len(),
            join_endpoints(responded)
        )
    }
}

/// Quorum checking state machine.
///
/// Construct one against the candidate configuration and the index of the
/// local member, then drive it with a [`ScatterGatherRunner`]. Once the
/// runner returns, [`QuorumChecker::final_status`] holds the verdict. The
/// configuration is borrowed for the checker's whole life and must not change
/// underneath it.
pub struct QuorumChecker<'a> {
    config: &'a ReplicaSetConfig,
    self_index: usize,
    // Total responses tabulated, self included.
    num_responses: usize,
    num_electable: usize,
    // Endpoints of voting members that answered affirmatively, in arrival order.
    voters: Vec<HostAndPort>,
    // Endpoints believed to be down, in arrival order.
    down: Vec<HostAndPort>,
    veto: Option<QuorumCheckError>,
    final_status: Result<(), QuorumCheckError>,
    completed: bool,
}

impl<'a> QuorumChecker<'a> {
    pub fn new(config: &'a ReplicaSetConfig, self_index: usize) -> Self {
        assert!(
            self_index < config.num_members(),
            "self index {self_index} out of range for {} members",
            config.num_members()
        );
        let me = config.member_at(self_index);
        let mut checker = Self {
            config,
            self_index,
            num_responses: 1,
            num_electable: usize::from(me.is_electable()),
            voters: if me.is_voter() {
                vec![me.endpoint().clone()]
            } else {
                Vec::new()
            },
            down: Vec::new(),
            veto: None,
            // Sentinel verdict in case the run is torn down before completion.
            final_status: Err(QuorumCheckError::Canceled),
            completed: false,
        };
        if checker.has_sufficient_responses() {
            checker.finalize();
        }
        checker
    }

    pub fn final_status(&self) -> Result<(), QuorumCheckError> {
        self.final_status.clone()
    }

    fn candidate_version_i64(&self) -> i64 {
        i64::try_from(self.config.version()).unwrap_or(i64::MAX)
    }

    fn tabulate(&mut self, request: &RemoteCommandRequest, result: &RemoteCommandResult) {
        self.num_responses += 1;

        let reply = match result {
            Ok(data) => data,
            Err(err) => {
                warn!(
                    "event=quorum_heartbeat_failed target={} error={err}",
                    request.target
                );
                self.down.push(request.target.clone());
                return;
            }
        };
        let response = HeartbeatResponse::from_reply(reply);

        if response.mismatch {
            warn!(
                "event=quorum_set_name_mismatch set={} target={}",
                self.config.set_name(),
                request.target
            );
            self.veto = Some(QuorumCheckError::SetNameMismatch {
                target: request.target.clone(),
            });
            return;
        }
        if response.has_installed_config() && response.config_version >= self.candidate_version_i64()
        {
            warn!(
                "event=quorum_config_version_stale ours={} target={} theirs={}",
                self.config.version(),
                request.target,
                response.config_version
            );
            self.veto = Some(QuorumCheckError::ConfigVersionStale {
                target: request.target.clone(),
                ours: self.config.version(),
                theirs: response.config_version,
            });
            return;
        }
        if !response.ok {
            warn!("event=quorum_heartbeat_rejected target={}", request.target);
            self.down.push(request.target.clone());
            return;
        }

        // Requests only ever go to configured members, so the target always
        // resolves.
        let Some(member) = self.config.member_by_endpoint(&request.target) else {
            unreachable!(
                "heartbeat completion from {} which is not a member of set {}",
                request.target,
                self.config.set_name()
            );
        };
        if member.is_electable() {
            self.num_electable += 1;
        }
        if member.is_voter() {
            self.voters.push(request.target.clone());
        }
    }

    fn finalize(&mut self) {
        self.completed = true;
        if let Some(veto) = &self.veto {
            self.final_status = Err(veto.clone());
            return;
        }
        if self.config.version() == 1 && !self.down.is_empty() {
            self.final_status = Err(QuorumCheckError::UnreachableAtInitiate {
                down: self.down.clone(),
            });
            return;
        }
        if self.num_electable == 0 {
            self.final_status = Err(QuorumCheckError::NoElectableResponded);
            return;
        }
        if self.voters.len() < self.config.majority_vote_count() {
            self.final_status = Err(QuorumCheckError::VoterMajorityNotMet {
                required: self.config.majority_vote_count(),
                responded: self.voters.clone(),
            });
            return;
        }
        self.final_status = Ok(());
    }
}

impl ScatterGatherAlgorithm for QuorumChecker<'_> {
    fn requests(&self) -> Vec<RemoteCommandRequest> {
        if self.has_sufficient_responses() {
            return Vec::new();
        }
        let me = self.config.member_at(self.self_index);
        let probe = HeartbeatRequest {
            set_name: self.config.set_name().to_string(),
            protocol_version: HEARTBEAT_PROTOCOL_VERSION,
            config_version: self.config.version(),
            // At initiate, tell recipients to refuse if they already hold
            // data, so a populated node cannot be silently clobbered.
            check_empty: self.config.version() == 1,
            sender_host: me.endpoint().clone(),
            sender_id: me.id(),
        };
        let command = probe.to_command();
        self.config
            .members()
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != self.self_index)
            .map(|(_, member)| {
                RemoteCommandRequest::new(
                    member.endpoint().clone(),
                    command.clone(),
                    self.config.heartbeat_timeout(),
                )
            })
            .collect()
    }

    fn process_response(&mut self, request: &RemoteCommandRequest, result: &RemoteCommandResult) {
        if self.completed {
            // Completions can legitimately race the terminal event; absorb
            // them without touching the verdict.
            return;
        }
        self.tabulate(request, result);
        if self.has_sufficient_responses() {
            self.finalize();
        }
    }

    fn has_sufficient_responses(&self) -> bool {
        if self.veto.is_some() || self.num_responses == self.config.num_members() {
            return true;
        }
        if self.config.version() == 1 {
            // Initial configuration: every member must be heard from.
            return false;
        }
        if self.num_electable == 0 {
            return false;
        }
        self.voters.len() >= self.config.majority_vote_count()
    }
}

/// Validates that the first configuration of a replica set can be installed.
pub async fn check_quorum_for_initiate<E>(
    executor: &E,
    config: &ReplicaSetConfig,
    self_index: usize,
) -> Result<(), QuorumCheckError>
where
    E: RemoteExecutor + ?Sized,
{
    assert_eq!(
        config.version(),
        1,
        "initiate requires a version 1 configuration"
    );
    check_quorum(executor, config, self_index).await
}

/// Validates that a replacement configuration can be installed over an
/// existing one.
pub async fn check_quorum_for_reconfig<E>(
    executor: &E,
    config: &ReplicaSetConfig,
    self_index: usize,
) -> Result<(), QuorumCheckError>
where
    E: RemoteExecutor + ?Sized,
{
    assert!(
        config.version() > 1,
        "reconfig requires a configuration version greater than 1"
    );
    check_quorum(executor, config, self_index).await
}

async fn check_quorum<E>(
    executor: &E,
    config: &ReplicaSetConfig,
    self_index: usize,
) -> Result<(), QuorumCheckError>
where
    E: RemoteExecutor + ?Sized,
{
    let mut checker = QuorumChecker::new(config, self_index);
    let mut runner = ScatterGatherRunner::new(&mut checker);
    match runner.run(executor).await {
        Ok(()) => checker.final_status(),
        Err(ScatterGatherError::Canceled) => Err(QuorumCheckError::Canceled),
    }
}
