use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::transport::{
    EndpointCall, Envelope, HttpTransport, Method, Transport, TransportSettings,
};

/// Verb-level wrapper around a [`Transport`].
///
/// Every helper funnels through [`ApiClient::request`], so all calls share one
/// error shape. Cloning is cheap; clones share the transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn http(settings: TransportSettings) -> Result<Self, ApiError> {
        Ok(Self::new(Arc::new(HttpTransport::new(settings)?)))
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        call: EndpointCall,
    ) -> Result<Envelope<T>, ApiError> {
        let envelope = self.transport.send(call).await?;
        let status = envelope.status;
        let Envelope { data, message, .. } = envelope;
        let data = serde_json::from_value::<T>(data).map_err(|err| {
            ApiError::parse(status, format!("Unexpected response shape: {err}"))
        })?;
        Ok(Envelope {
            data,
            status,
            message,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        self.request(EndpointCall::new(Method::Get, path)).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<Envelope<T>, ApiError> {
        let mut call = EndpointCall::new(Method::Get, path);
        call.query = query;
        self.request(call).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ApiError> {
        self.request(with_body(Method::Post, path, body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ApiError> {
        self.request(with_body(Method::Put, path, body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ApiError> {
        self.request(with_body(Method::Patch, path, body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        self.request(EndpointCall::new(Method::Delete, path)).await
    }
}

fn with_body<B: Serialize + ?Sized>(
    method: Method,
    path: &str,
    body: Option<&B>,
) -> Result<EndpointCall, ApiError> {
    let call = EndpointCall::new(method, path);
    match body {
        Some(body) => {
            let value: Value = serde_json::to_value(body)
                .map_err(|err| ApiError::transport(format!("Failed to encode body: {err}")))?;
            Ok(call.body(value))
        }
        None => Ok(call),
    }
}
