#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoSuggestionId {
    #[prost(uint64, tag = "1")]
    pub round: u64,
    #[prost(string, tag = "2")]
    pub proposer_id: ::prost::alloc::string::String,
}
/// Wraps a string so "absent" and "empty" stay distinguishable.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoText {
    #[prost(string, tag = "1")]
    pub text: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoValue {
    #[prost(enumeration = "ProtoCommand", tag = "1")]
    pub command: i32,
    #[prost(message, optional, tag = "2")]
    pub key: ::core::option::Option<ProtoText>,
    #[prost(message, optional, tag = "3")]
    pub new_value: ::core::option::Option<ProtoText>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoRegisterReq {
    #[prost(string, tag = "1")]
    pub replica_id: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoRegisterResult {
    #[prost(bool, tag = "1")]
    pub registered: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoRequestPermissionReq {
    #[prost(message, optional, tag = "1")]
    pub suggestion_id: ::core::option::Option<ProtoSuggestionId>,
    #[prost(uint64, tag = "2")]
    pub state_id: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoAcceptedProposal {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<ProtoSuggestionId>,
    #[prost(message, optional, tag = "2")]
    pub value: ::core::option::Option<ProtoValue>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoGranted {
    /// Absent when nothing has been accepted for the requested slot yet.
    #[prost(message, optional, tag = "1")]
    pub last_accepted: ::core::option::Option<ProtoAcceptedProposal>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoNack {
    #[prost(message, optional, tag = "1")]
    pub promised_id: ::core::option::Option<ProtoSuggestionId>,
}
/// Empty
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoStateNack {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoGrantedMessage {
    #[prost(oneof = "proto_granted_message::Permission", tags = "1, 2, 3")]
    pub permission: ::core::option::Option<proto_granted_message::Permission>,
}
/// Nested message and enum types in `ProtoGrantedMessage`.
pub mod proto_granted_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Permission {
        #[prost(message, tag = "1")]
        Granted(super::ProtoGranted),
        #[prost(message, tag = "2")]
        Nack(super::ProtoNack),
        #[prost(message, tag = "3")]
        StateNack(super::ProtoStateNack),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoSuggestValueReq {
    #[prost(message, optional, tag = "1")]
    pub suggestion_id: ::core::option::Option<ProtoSuggestionId>,
    #[prost(message, optional, tag = "2")]
    pub value: ::core::option::Option<ProtoValue>,
    #[prost(uint64, tag = "3")]
    pub state_id: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoSuggestValueResult {
    #[prost(bool, tag = "1")]
    pub accepted: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoReportConsensusReq {
    #[prost(message, optional, tag = "1")]
    pub value: ::core::option::Option<ProtoValue>,
    #[prost(uint64, tag = "2")]
    pub state_id: u64,
}
/// Empty
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoReportConsensusResult {}
/// Empty
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoGetStateIdReq {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoGetStateIdResult {
    #[prost(uint64, tag = "1")]
    pub state_id: u64,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoCommand {
    NoOp = 0,
    Put = 1,
    Delete = 2,
}
#[doc = r" Generated client implementations."]
pub mod grpc_paxos_client {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    #[doc = " Replica-to-replica surface. Every replica serves this, and every replica's proposer calls it on"]
    #[doc = " every member of the cluster (itself included, although the local call does not go over the wire)."]
    pub struct GrpcPaxosClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl GrpcPaxosClient<tonic::transport::Channel> {
        #[doc = r" Attempt to create a new client by connecting to a given endpoint."]
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: std::convert::TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> GrpcPaxosClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::ResponseBody: Body + HttpBody + Send + 'static,
        T::Error: Into<StdError>,
        <T::ResponseBody as HttpBody>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = tonic::client::Grpc::with_interceptor(inner, interceptor);
            Self { inner }
        }
        #[doc = " Reverse-registration handshake so the callee can reach the caller too."]
        pub async fn register_this_id(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoRegisterReq>,
        ) -> Result<tonic::Response<super::ProtoRegisterResult>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/paxos.GrpcPaxos/RegisterThisId");
            self.inner.unary(request.into_request(), path, codec).await
        }
        #[doc = " Acceptor: phase 1."]
        pub async fn request_permission(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoRequestPermissionReq>,
        ) -> Result<tonic::Response<super::ProtoGrantedMessage>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/paxos.GrpcPaxos/RequestPermission");
            self.inner.unary(request.into_request(), path, codec).await
        }
        #[doc = " Acceptor: phase 2."]
        pub async fn suggest_value(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoSuggestValueReq>,
        ) -> Result<tonic::Response<super::ProtoSuggestValueResult>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/paxos.GrpcPaxos/SuggestValue");
            self.inner.unary(request.into_request(), path, codec).await
        }
        #[doc = " Learner."]
        pub async fn report_consensus(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoReportConsensusReq>,
        ) -> Result<tonic::Response<super::ProtoReportConsensusResult>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/paxos.GrpcPaxos/ReportConsensus");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn get_state_id(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoGetStateIdReq>,
        ) -> Result<tonic::Response<super::ProtoGetStateIdResult>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/paxos.GrpcPaxos/GetStateId");
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
    impl<T: Clone> Clone for GrpcPaxosClient<T> {
        fn clone(&self) -> Self {
            Self {
                inner: self.inner.clone(),
            }
        }
    }
    impl<T> std::fmt::Debug for GrpcPaxosClient<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "GrpcPaxosClient {{ ... }}")
        }
    }
}
#[doc = r" Generated server implementations."]
pub mod grpc_paxos_server {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    #[doc = "Generated trait containing gRPC methods that should be implemented for use with GrpcPaxosServer."]
    #[async_trait]
    pub trait GrpcPaxos: Send + Sync + 'static {
        #[doc = " Reverse-registration handshake so the callee can reach the caller too."]
        async fn register_this_id(
            &self,
            request: tonic::Request<super::ProtoRegisterReq>,
        ) -> Result<tonic::Response<super::ProtoRegisterResult>, tonic::Status>;
        #[doc = " Acceptor: phase 1."]
        async fn request_permission(
            &self,
            request: tonic::Request<super::ProtoRequestPermissionReq>,
        ) -> Result<tonic::Response<super::ProtoGrantedMessage>, tonic::Status>;
        #[doc = " Acceptor: phase 2."]
        async fn suggest_value(
            &self,
            request: tonic::Request<super::ProtoSuggestValueReq>,
        ) -> Result<tonic::Response<super::ProtoSuggestValueResult>, tonic::Status>;
        #[doc = " Learner."]
        async fn report_consensus(
            &self,
            request: tonic::Request<super::ProtoReportConsensusReq>,
        ) -> Result<tonic::Response<super::ProtoReportConsensusResult>, tonic::Status>;
        async fn get_state_id(
            &self,
            request: tonic::Request<super::ProtoGetStateIdReq>,
        ) -> Result<tonic::Response<super::ProtoGetStateIdResult>, tonic::Status>;
    }
    #[doc = " Replica-to-replica surface. Every replica serves this, and every replica's proposer calls it on"]
    #[doc = " every member of the cluster (itself included, although the local call does not go over the wire)."]
    #[derive(Debug)]
    pub struct GrpcPaxosServer<T: GrpcPaxos> {
        inner: _Inner<T>,
    }
    struct _Inner<T>(Arc<T>, Option<tonic::Interceptor>);
    impl<T: GrpcPaxos> GrpcPaxosServer<T> {
        pub fn new(inner: T) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, None);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, Some(interceptor.into()));
            Self { inner }
        }
    }
    impl<T, B> Service<http::Request<B>> for GrpcPaxosServer<T>
    where
        T: GrpcPaxos,
        B: HttpBody + Send + Sync + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = Never;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/paxos.GrpcPaxos/RegisterThisId" => {
                    #[allow(non_camel_case_types)]
                    struct RegisterThisIdSvc<T: GrpcPaxos>(pub Arc<T>);
                    impl<T: GrpcPaxos> tonic::server::UnaryService<super::ProtoRegisterReq> for RegisterThisIdSvc<T> {
                        type Response = super::ProtoRegisterResult;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoRegisterReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).register_this_id(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = RegisterThisIdSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/paxos.GrpcPaxos/RequestPermission" => {
                    #[allow(non_camel_case_types)]
                    struct RequestPermissionSvc<T: GrpcPaxos>(pub Arc<T>);
                    impl<T: GrpcPaxos> tonic::server::UnaryService<super::ProtoRequestPermissionReq>
                        for RequestPermissionSvc<T>
                    {
                        type Response = super::ProtoGrantedMessage;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoRequestPermissionReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).request_permission(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = RequestPermissionSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/paxos.GrpcPaxos/SuggestValue" => {
                    #[allow(non_camel_case_types)]
                    struct SuggestValueSvc<T: GrpcPaxos>(pub Arc<T>);
                    impl<T: GrpcPaxos> tonic::server::UnaryService<super::ProtoSuggestValueReq> for SuggestValueSvc<T> {
                        type Response = super::ProtoSuggestValueResult;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoSuggestValueReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).suggest_value(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = SuggestValueSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/paxos.GrpcPaxos/ReportConsensus" => {
                    #[allow(non_camel_case_types)]
                    struct ReportConsensusSvc<T: GrpcPaxos>(pub Arc<T>);
                    impl<T: GrpcPaxos> tonic::server::UnaryService<super::ProtoReportConsensusReq>
                        for ReportConsensusSvc<T>
                    {
                        type Response = super::ProtoReportConsensusResult;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoReportConsensusReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).report_consensus(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = ReportConsensusSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/paxos.GrpcPaxos/GetStateId" => {
                    #[allow(non_camel_case_types)]
                    struct GetStateIdSvc<T: GrpcPaxos>(pub Arc<T>);
                    impl<T: GrpcPaxos> tonic::server::UnaryService<super::ProtoGetStateIdReq> for GetStateIdSvc<T> {
                        type Response = super::ProtoGetStateIdResult;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoGetStateIdReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).get_state_id(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = GetStateIdSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(tonic::body::BoxBody::empty())
                        .unwrap())
                }),
            }
        }
    }
    impl<T: GrpcPaxos> Clone for GrpcPaxosServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self { inner }
        }
    }
    impl<T: GrpcPaxos> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(self.0.clone(), self.1.clone())
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: GrpcPaxos> tonic::transport::NamedService for GrpcPaxosServer<T> {
        const NAME: &'static str = "paxos.GrpcPaxos";
    }
}
