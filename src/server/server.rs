use crate::grpc::grpc_paxos_server::{GrpcPaxos, GrpcPaxosServer};
use crate::grpc::{
    ProtoGetStateIdReq, ProtoGetStateIdResult, ProtoGrantedMessage, ProtoRegisterReq, ProtoRegisterResult,
    ProtoReportConsensusReq, ProtoReportConsensusResult, ProtoRequestPermissionReq, ProtoSuggestValueReq,
    ProtoSuggestValueResult,
};
use crate::paxos::{ReplicaId, ReplicaNode};
use crate::server::wire;
use crate::server::ShutdownSignal;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// RpcServer is the type that implements the Paxos gRPC interface. It serves the local replica's
/// response methods to every other replica's proposer.
pub(crate) struct RpcServer {
    logger: slog::Logger,
    local_replica: Arc<ReplicaNode>,
}

impl RpcServer {
    pub(crate) fn new(logger: slog::Logger, local_replica: Arc<ReplicaNode>) -> Self {
        RpcServer { logger, local_replica }
    }

    pub(crate) async fn run(self, socket_addr: SocketAddr, shutdown_signal: ShutdownSignal) {
        let logger = self.logger.clone();
        slog::info!(logger, "Listening on '{:?}'", socket_addr);

        let result = Server::builder()
            .add_service(GrpcPaxosServer::new(self))
            .serve_with_shutdown(socket_addr, shutdown_signal)
            .await;

        slog::info!(logger, "Server run() has exited: {:?}", result);
    }

    async fn handle_register_this_id(&self, rpc_request: ProtoRegisterReq) -> Result<ProtoRegisterResult, Status> {
        if rpc_request.replica_id.is_empty() {
            return Err(Status::invalid_argument("Empty replica id"));
        }

        let registered = self
            .local_replica
            .handle_register_this_id(ReplicaId::new(rpc_request.replica_id))
            .await;
        Ok(ProtoRegisterResult { registered })
    }

    fn handle_request_permission(&self, rpc_request: ProtoRequestPermissionReq) -> Result<ProtoGrantedMessage, Status> {
        let suggestion_id =
            wire::decode_suggestion_id("suggestion_id", rpc_request.suggestion_id).map_err(Status::invalid_argument)?;
        let state_id = wire::decode_state_id(rpc_request.state_id).map_err(Status::invalid_argument)?;

        let reply = self.local_replica.handle_request_permission(suggestion_id, state_id);
        Ok(wire::encode_granted_message(reply))
    }

    fn handle_suggest_value(&self, rpc_request: ProtoSuggestValueReq) -> Result<ProtoSuggestValueResult, Status> {
        let suggestion_id =
            wire::decode_suggestion_id("suggestion_id", rpc_request.suggestion_id).map_err(Status::invalid_argument)?;
        let value = wire::decode_value(rpc_request.value).map_err(Status::invalid_argument)?;
        let state_id = wire::decode_state_id(rpc_request.state_id).map_err(Status::invalid_argument)?;

        let accepted = self.local_replica.handle_suggest_value(suggestion_id, value, state_id);
        Ok(ProtoSuggestValueResult { accepted })
    }

    fn handle_report_consensus(
        &self,
        rpc_request: ProtoReportConsensusReq,
    ) -> Result<ProtoReportConsensusResult, Status> {
        let value = wire::decode_value(rpc_request.value).map_err(Status::invalid_argument)?;
        let state_id = wire::decode_state_id(rpc_request.state_id).map_err(Status::invalid_argument)?;

        self.local_replica.handle_report_consensus(value, state_id);
        Ok(ProtoReportConsensusResult {
            // Empty
        })
    }

    fn handle_get_state_id(&self, _: ProtoGetStateIdReq) -> Result<ProtoGetStateIdResult, Status> {
        Ok(ProtoGetStateIdResult {
            state_id: self.local_replica.state_id().as_u64(),
        })
    }
}

#[async_trait::async_trait]
impl GrpcPaxos for RpcServer {
    async fn register_this_id(
        &self,
        rpc_request_wrapped: Request<ProtoRegisterReq>,
    ) -> Result<Response<ProtoRegisterResult>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_register_this_id(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn request_permission(
        &self,
        rpc_request_wrapped: Request<ProtoRequestPermissionReq>,
    ) -> Result<Response<ProtoGrantedMessage>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_request_permission(rpc_request);
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn suggest_value(
        &self,
        rpc_request_wrapped: Request<ProtoSuggestValueReq>,
    ) -> Result<Response<ProtoSuggestValueResult>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_suggest_value(rpc_request);
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn report_consensus(
        &self,
        rpc_request_wrapped: Request<ProtoReportConsensusReq>,
    ) -> Result<Response<ProtoReportConsensusResult>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_report_consensus(rpc_request);
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn get_state_id(
        &self,
        rpc_request_wrapped: Request<ProtoGetStateIdReq>,
    ) -> Result<Response<ProtoGetStateIdResult>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_get_state_id(rpc_request);
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }
}
