//! gRPC method discovery over server reflection.
use crate::{
    admin::types::DiscoveredMethod,
    error::GatewayError,
    transcode::{ReflectionClient, reflection},
};

/// Enumerate all methods the backend advertises, per service, via reflection.
pub async fn discover_methods(target: &str) -> Result<Vec<DiscoveredMethod>, GatewayError> {
    let channel = reflection::dial(target).await?;
    let mut client = ReflectionClient::new(channel);

    let mut out = Vec::new();
    for service_name in client.list_services().await? {
        let descriptor = match client.resolve_service(&service_name).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(service = %service_name, error = %e, "resolve failed during discovery");
                continue;
            }
        };
        for method in descriptor.methods() {
            out.push(DiscoveredMethod {
                service: service_name.clone(),
                method: method.name().to_string(),
                grpc_method: format!("{service_name}/{}", method.name()),
            });
        }
    }
    Ok(out)
}

/// Pick an HTTP method for a discovered gRPC method by name prefix:
/// `Create*` posts, `Update*` puts, `Delete*` deletes, everything else gets.
pub fn http_method_for(grpc_method_name: &str) -> &'static str {
    let upper = grpc_method_name.to_ascii_uppercase();
    if upper.starts_with("CREATE") {
        "POST"
    } else if upper.starts_with("UPDATE") {
        "PUT"
    } else if upper.starts_with("DELETE") {
        "DELETE"
    } else {
        "GET"
    }
}

/// Kebab-case a method name: insert `-` before each non-initial upper-case
/// letter, then lower-case everything.
pub fn to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('-');
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Default REST path for a discovered method.
pub fn default_path(grpc_method_name: &str) -> String {
    format!("/{}", to_kebab(grpc_method_name))
}
