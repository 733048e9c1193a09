//! Server reflection client used for descriptor resolution and discovery.
//!
//! Speaks the `v1alpha` reflection protocol, which is what the gRPC backends
//! in the wild still overwhelmingly advertise. Each resolution opens one
//! bidirectional stream, sends a single request, and reads a single response.
use std::time::Duration;

use prost::Message;
use prost_reflect::{DescriptorPool, ServiceDescriptor};
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use tonic::transport::{Channel, Endpoint};
use tonic_reflection::pb::v1alpha::{
    ServerReflectionRequest,
    server_reflection_client::ServerReflectionClient,
    server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};

use crate::error::GatewayError;

/// Name of the reflection service itself, excluded from discovery listings.
const REFLECTION_SERVICE: &str = "grpc.reflection.v1alpha.ServerReflection";

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Dial a gRPC backend with plaintext credentials.
pub async fn dial(target: &str) -> Result<Channel, GatewayError> {
    let endpoint = Endpoint::from_shared(format!("http://{target}"))
        .map_err(|e| GatewayError::Upstream(format!("invalid grpc target {target}: {e}")))?
        .connect_timeout(DIAL_TIMEOUT);
    endpoint
        .connect()
        .await
        .map_err(|e| GatewayError::Upstream(format!("upstream dial failed: {e}")))
}

/// Thin wrapper over the generated reflection client.
pub struct ReflectionClient {
    client: ServerReflectionClient<Channel>,
}

impl ReflectionClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: ServerReflectionClient::new(channel),
        }
    }

    /// Resolve the descriptor for a fully-qualified service name.
    ///
    /// The upstream's `file_containing_symbol` answer carries the file and
    /// its transitive dependencies; they are folded into a fresh descriptor
    /// pool per request.
    pub async fn resolve_service(&mut self, name: &str) -> Result<ServiceDescriptor, GatewayError> {
        let files = self
            .request_descriptors(MessageRequest::FileContainingSymbol(name.to_string()))
            .await?;

        let mut set = FileDescriptorSet::default();
        for raw in &files {
            let file = FileDescriptorProto::decode(raw.as_slice()).map_err(|e| {
                GatewayError::Upstream(format!("invalid file descriptor from reflection: {e}"))
            })?;
            set.file.push(file);
        }

        let pool = DescriptorPool::from_file_descriptor_set(set).map_err(|e| {
            GatewayError::Upstream(format!("could not assemble descriptor pool: {e}"))
        })?;

        pool.get_service_by_name(name)
            .ok_or_else(|| GatewayError::BadRequest(format!("service not found: {name}")))
    }

    /// List the fully-qualified service names the upstream advertises,
    /// excluding the reflection service itself. Sorted.
    pub async fn list_services(&mut self) -> Result<Vec<String>, GatewayError> {
        let response = self
            .round_trip(MessageRequest::ListServices(String::new()))
            .await?;
        match response {
            MessageResponse::ListServicesResponse(list) => {
                let mut names: Vec<String> = list
                    .service
                    .into_iter()
                    .map(|s| s.name)
                    .filter(|name| name != REFLECTION_SERVICE)
                    .collect();
                names.sort();
                Ok(names)
            }
            MessageResponse::ErrorResponse(err) => Err(GatewayError::Upstream(format!(
                "reflection error {}: {}",
                err.error_code, err.error_message
            ))),
            _ => Err(GatewayError::Upstream(
                "unexpected reflection response to ListServices".to_string(),
            )),
        }
    }

    async fn request_descriptors(
        &mut self,
        request: MessageRequest,
    ) -> Result<Vec<Vec<u8>>, GatewayError> {
        let response = self.round_trip(request).await?;
        match response {
            MessageResponse::FileDescriptorResponse(files) => Ok(files.file_descriptor_proto),
            MessageResponse::ErrorResponse(err) => {
                // NOT_FOUND means the upstream does not advertise the symbol.
                if err.error_code == tonic::Code::NotFound as i32 {
                    Err(GatewayError::BadRequest(format!(
                        "service not found: {}",
                        err.error_message
                    )))
                } else {
                    Err(GatewayError::Upstream(format!(
                        "reflection error {}: {}",
                        err.error_code, err.error_message
                    )))
                }
            }
            _ => Err(GatewayError::Upstream(
                "unexpected reflection response to FileContainingSymbol".to_string(),
            )),
        }
    }

    async fn round_trip(
        &mut self,
        request: MessageRequest,
    ) -> Result<MessageResponse, GatewayError> {
        let request = ServerReflectionRequest {
            host: String::new(),
            message_request: Some(request),
        };
        let mut stream = self
            .client
            .server_reflection_info(tokio_stream::once(request))
            .await
            .map_err(|s| GatewayError::Upstream(format!("reflection unavailable: {s}")))?
            .into_inner();

        let response = stream
            .message()
            .await
            .map_err(|s| GatewayError::Upstream(format!("reflection stream failed: {s}")))?
            .ok_or_else(|| GatewayError::Upstream("reflection stream closed early".to_string()))?;

        response
            .message_response
            .ok_or_else(|| GatewayError::Upstream("empty reflection response".to_string()))
    }
}
