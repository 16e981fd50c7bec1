use super::{
    AppointmentRequest, BackendError, BookingBackend, NewCustomer, APPOINTMENTS_PATH,
    CUSTOMER_PATH, DELETE_APPOINTMENT_PATH,
};
use crate::config::UpstreamConfig;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

/// reqwest-backed client for the Ontiloo open API
#[derive(Debug)]
pub struct OntilooClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    bearer_token: Option<SecretString>,
}

impl OntilooClient {
    pub fn new(upstream: &UpstreamConfig) -> Result<Self> {
        let api_key = upstream.api_key.expose_secret().trim();
        if api_key.is_empty() {
            return Err(anyhow!("MISSING_ONTILOO_API_KEY: set ONTILOO_API_KEY"));
        }

        Ok(Self {
            http: Client::new(),
            base_url: upstream.base_url.trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key.to_string()),
            bearer_token: upstream
                .bearer_token
                .as_ref()
                .map(|token| token.expose_secret().trim())
                .filter(|token| !token.is_empty())
                .map(|token| SecretString::from(token.to_string())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Ontiloo {} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-api-key", self.api_key.expose_secret());

        if let Some(token) = &self.bearer_token {
            request = request.header(AUTHORIZATION, bearer_header(token.expose_secret()));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let payload = parse_body(&text);

        if !status.is_success() {
            info!("Ontiloo {} {} returned {}", method, path, status);
            return Err(rejected(status, payload));
        }

        Ok(payload)
    }
}

#[async_trait]
impl BookingBackend for OntilooClient {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Value, BackendError> {
        let body = serde_json::to_value(customer).map_err(|e| BackendError::Transport(e.to_string()))?;
        self.send(Method::POST, CUSTOMER_PATH, Some(body)).await
    }

    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> Result<Value, BackendError> {
        let body = serde_json::to_value(request).map_err(|e| BackendError::Transport(e.to_string()))?;
        self.send(Method::POST, APPOINTMENTS_PATH, Some(body)).await
    }

    async fn delete_appointment(&self, appointment_id: u64) -> Result<Value, BackendError> {
        let path = format!("{}/{}", DELETE_APPOINTMENT_PATH, appointment_id);
        self.send(Method::DELETE, &path, None).await
    }
}

fn bearer_header(token: &str) -> String {
    if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}

/// Empty bodies become `{}`, non-JSON bodies are wrapped as `{"raw": ...}`
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

fn rejected(status: StatusCode, payload: Value) -> BackendError {
    let code = payload
        .get("code")
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "ONTILOO_ERROR".to_string());
    let message = payload
        .get("message")
        .or_else(|| payload.get("raw"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    BackendError::Rejected {
        status: status.as_u16(),
        code,
        message,
        payload,
    }
}
