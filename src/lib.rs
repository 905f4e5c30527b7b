//! Quorum check for replica-set configuration changes.
//!
//! Before a candidate configuration is installed — the very first one at
//! initiate, or a replacement at reconfig — every other member is probed with
//! a heartbeat and the responses are fused into a single accept/reject
//! verdict. The scatter-gather machinery is generic over the decision
//! algorithm; the quorum checker is the decision algorithm for configuration
//! changes.
#![deny(unreachable_pub)]
#![deny(unused_must_use)]

pub mod config;
pub mod executor;
pub mod heartbeat;
pub mod quorum;
pub mod scatter_gather;

pub use config::{
    ConfigError, HostAndPort, MemberConfig, ReplicaSetConfig, DEFAULT_HEARTBEAT_TIMEOUT,
};
pub use executor::{
    PinFuture, RemoteCommandError, RemoteCommandRequest, RemoteCommandResult, RemoteExecutor,
};
pub use heartbeat::{
    HeartbeatFrameError, HeartbeatRequest, HeartbeatResponse, HEARTBEAT_PROTOCOL_VERSION,
};
pub use quorum::{
    check_quorum_for_initiate, check_quorum_for_reconfig, QuorumCheckError, QuorumCheckErrorKind,
    QuorumChecker,
};
pub use scatter_gather::{ScatterGatherAlgorithm, ScatterGatherError, ScatterGatherRunner};
