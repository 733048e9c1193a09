//! JSON-to-gRPC transcoding for unary RPCs.
//!
//! The transcoder dials the backend per request, resolves the method's
//! descriptors through server reflection, builds a dynamic request message
//! from the JSON body merged with routing parameters, invokes the RPC, and
//! renders the reply as JSON. Only unary methods are supported.
pub mod codec;
pub mod reflection;

use http::uri::PathAndQuery;
use prost_reflect::DynamicMessage;
use serde_json::{Map, Value};
use tonic::metadata::MetadataValue;

use crate::error::GatewayError;
use codec::DynamicCodec;
pub use reflection::ReflectionClient;

/// Parameters merged into the request body; keys are RPC field names.
pub type Params = Map<String, Value>;

/// One transcoding invocation.
pub struct TranscodeCall {
    /// gRPC backend, `host:port`.
    pub target: String,
    /// `package.Service/Method`, leading `/` already stripped by the caller.
    pub method_path: String,
    /// Path-template and query captures; may be empty.
    pub params: Params,
    /// Raw request body; may be empty.
    pub body: Vec<u8>,
    /// Inbound `Authorization` header to propagate as gRPC metadata.
    pub authorization: Option<String>,
}

/// Invoke a unary RPC described by `call` and return the reply as JSON bytes.
pub async fn invoke_unary(call: TranscodeCall) -> Result<Vec<u8>, GatewayError> {
    let (service, method) = split_method_path(&call.method_path)?;

    let channel = reflection::dial(&call.target).await?;

    let mut reflection = ReflectionClient::new(channel.clone());
    let service_desc = reflection.resolve_service(service).await?;
    let method_desc = service_desc
        .methods()
        .find(|m| m.name() == method)
        .ok_or_else(|| GatewayError::BadRequest(format!("method not found: {method}")))?;

    if method_desc.is_client_streaming() || method_desc.is_server_streaming() {
        return Err(GatewayError::BadRequest(format!(
            "streaming method not supported: {service}/{method}"
        )));
    }

    let payload = merge_body_params(&call.body, &call.params);
    let mut deserializer = serde_json::Deserializer::from_slice(&payload);
    let input = DynamicMessage::deserialize(method_desc.input(), &mut deserializer)
        .map_err(|e| GatewayError::BadRequest(format!("invalid JSON for request message: {e}")))?;

    let mut request = tonic::Request::new(input);
    if let Some(auth) = &call.authorization {
        let value = MetadataValue::try_from(auth.as_str())
            .map_err(|_| GatewayError::BadRequest("invalid authorization header".to_string()))?;
        request.metadata_mut().insert("authorization", value);
    }

    let path: PathAndQuery = format!("/{service}/{method}")
        .parse()
        .map_err(|e| GatewayError::BadRequest(format!("invalid method path: {e}")))?;

    let mut grpc = tonic::client::Grpc::new(channel);
    grpc.ready()
        .await
        .map_err(|e| GatewayError::Upstream(format!("upstream not ready: {e}")))?;

    let response = grpc
        .unary(request, path, DynamicCodec::new(method_desc.output()))
        .await
        .map_err(|status| {
            GatewayError::Upstream(format!("grpc error: {}", format_status(&status)))
        })?;

    serde_json::to_vec(&response.into_inner())
        .map_err(|e| GatewayError::Internal(format!("failed to marshal response: {e}")))
}

/// Split `package.Service/Method` into its service and method parts.
pub fn split_method_path(path: &str) -> Result<(&str, &str), GatewayError> {
    let full = path.trim_start_matches('/');
    match full.rsplit_once('/') {
        Some((service, method)) if !service.is_empty() && !method.is_empty() => {
            Ok((service, method))
        }
        _ => Err(GatewayError::BadRequest(
            "invalid gRPC method path; expected /package.Service/Method".to_string(),
        )),
    }
}

/// Merge routing params into the JSON request body.
///
/// The body always wins: params fill in missing keys only. An empty body with
/// params becomes the params object; an empty body without params becomes
/// `{}`. A body that is not a JSON object is forwarded untouched and the
/// params are dropped.
pub fn merge_body_params(body: &[u8], params: &Params) -> Vec<u8> {
    if body.is_empty() {
        if params.is_empty() {
            return b"{}".to_vec();
        }
        return serde_json::to_vec(params).unwrap_or_else(|_| b"{}".to_vec());
    }
    if params.is_empty() {
        return body.to_vec();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut object)) => {
            for (key, value) in params {
                object.entry(key.clone()).or_insert_with(|| value.clone());
            }
            serde_json::to_vec(&object).unwrap_or_else(|_| body.to_vec())
        }
        _ => body.to_vec(),
    }
}

fn format_status(status: &tonic::Status) -> String {
    if status.message().is_empty() {
        format!("{:?}", status.code())
    } else {
        format!("{:?}: {}", status.code(), status.message())
    }
}
