use crate::grpc::grpc_paxos_client::GrpcPaxosClient;
use crate::grpc::{
    ProtoGetStateIdReq, ProtoRegisterReq, ProtoReportConsensusReq, ProtoRequestPermissionReq, ProtoSuggestValueReq,
};
use crate::paxos::{
    ConnectError, GrantedMessage, MemberInfo, PaxosPeer, PeerCallError, PeerConnector, ReplicaId, StateId,
    SuggestionId, Value,
};
use crate::server::wire;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

const TRANSPORT_ERROR: &str = "transport error";

/// GrpcPeer is a remote replica, reached over gRPC.
pub(crate) struct GrpcPeer {
    logger: slog::Logger,
    client: GrpcPaxosClient<Channel>,
}

impl GrpcPeer {
    pub(crate) async fn connect(
        logger: slog::Logger,
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectError> {
        let url = format!("http://{}:{}", host, port);
        let endpoint = Endpoint::from_shared(url.clone()).map_err(|_| ConnectError::InvalidAddress(url.clone()))?;

        slog::debug!(logger, "Connecting to {} ...", url);
        let connection = match tokio::time::timeout(connect_timeout, endpoint.connect()).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => return Err(ConnectError::ConnectFailure(format!("{}: {}", url, e))),
            Err(_) => return Err(ConnectError::ConnectFailure(format!("{}: timed out", url))),
        };

        Ok(GrpcPeer {
            logger,
            client: GrpcPaxosClient::new(connection),
        })
    }

    // Channel is cheap to clone, and the generated client wants `&mut self`.
    fn client(&self) -> GrpcPaxosClient<Channel> {
        self.client.clone()
    }

    // tonic reports a failed connection (refused, reset) as `Unknown` with a transport error
    // message rather than `Unavailable`.
    fn convert_status(status: Status) -> PeerCallError {
        match status.code() {
            Code::Unavailable => PeerCallError::Unreachable,
            Code::Unknown if status.message().starts_with(TRANSPORT_ERROR) => PeerCallError::Unreachable,
            _ => PeerCallError::Rpc(format!("{:?}", status)),
        }
    }
}

#[async_trait::async_trait]
impl PaxosPeer for GrpcPeer {
    async fn register_this_id(&self, id: ReplicaId) -> Result<bool, PeerCallError> {
        let rpc_request = ProtoRegisterReq {
            replica_id: id.into_inner(),
        };

        slog::debug!(self.logger, "ClientWire - {:?}", rpc_request);
        let rpc_reply = self.client().register_this_id(rpc_request).await;
        slog::debug!(self.logger, "ClientWire - {:?}", rpc_reply);

        rpc_reply
            .map(|reply| reply.into_inner().registered)
            .map_err(Self::convert_status)
    }

    async fn request_permission(
        &self,
        suggestion_id: SuggestionId,
        state_id: StateId,
    ) -> Result<GrantedMessage, PeerCallError> {
        let rpc_request = ProtoRequestPermissionReq {
            suggestion_id: Some(wire::encode_suggestion_id(suggestion_id)),
            state_id: state_id.as_u64(),
        };

        slog::debug!(self.logger, "ClientWire - {:?}", rpc_request);
        let rpc_reply = self.client().request_permission(rpc_request).await;
        slog::debug!(self.logger, "ClientWire - {:?}", rpc_reply);

        let rpc_result = rpc_reply.map_err(Self::convert_status)?.into_inner();
        wire::decode_granted_message(rpc_result).map_err(PeerCallError::MalformedReply)
    }

    async fn suggest_value(
        &self,
        suggestion_id: SuggestionId,
        value: Value,
        state_id: StateId,
    ) -> Result<bool, PeerCallError> {
        let rpc_request = ProtoSuggestValueReq {
            suggestion_id: Some(wire::encode_suggestion_id(suggestion_id)),
            value: Some(wire::encode_value(value)),
            state_id: state_id.as_u64(),
        };

        slog::debug!(self.logger, "ClientWire - {:?}", rpc_request);
        let rpc_reply = self.client().suggest_value(rpc_request).await;
        slog::debug!(self.logger, "ClientWire - {:?}", rpc_reply);

        rpc_reply
            .map(|reply| reply.into_inner().accepted)
            .map_err(Self::convert_status)
    }

    async fn report_consensus(&self, value: Value, state_id: StateId) -> Result<(), PeerCallError> {
        let rpc_request = ProtoReportConsensusReq {
            value: Some(wire::encode_value(value)),
            state_id: state_id.as_u64(),
        };

        slog::debug!(self.logger, "ClientWire - {:?}", rpc_request);
        let rpc_reply = self.client().report_consensus(rpc_request).await;
        slog::debug!(self.logger, "ClientWire - {:?}", rpc_reply);

        rpc_reply.map(|_| ()).map_err(Self::convert_status)
    }

    async fn get_state_id(&self) -> Result<StateId, PeerCallError> {
        let rpc_request = ProtoGetStateIdReq {
            // Empty
        };

        slog::debug!(self.logger, "ClientWire - {:?}", rpc_request);
        let rpc_reply = self.client().get_state_id(rpc_request).await;
        slog::debug!(self.logger, "ClientWire - {:?}", rpc_reply);

        let rpc_result = rpc_reply.map_err(Self::convert_status)?.into_inner();
        wire::decode_state_id(rpc_result.state_id).map_err(PeerCallError::MalformedReply)
    }
}

/// GrpcConnector opens gRPC connections to configured replicas.
pub(crate) struct GrpcConnector {
    logger: slog::Logger,
    connect_timeout: Duration,
}

impl GrpcConnector {
    pub(crate) fn new(logger: slog::Logger, connect_timeout: Duration) -> Self {
        GrpcConnector {
            logger,
            connect_timeout,
        }
    }
}

#[async_trait::async_trait]
impl PeerConnector for GrpcConnector {
    async fn connect(&self, member: &MemberInfo) -> Result<Arc<dyn PaxosPeer>, ConnectError> {
        let logger = self
            .logger
            .new(slog::o!("Peer" => member.replica_id.as_str().to_string()));
        let peer = GrpcPeer::connect(logger, &member.host, member.port, self.connect_timeout).await?;
        Ok(Arc::new(peer))
    }
}
