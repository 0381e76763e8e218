//! HTTP request output.
//!
//! The device configuration provides defaults (`method`, `url`,
//! `bearer_token`, `post_data`); each action may override any of them.
//! `post_data` is merged key by key, with the action winning. A request
//! with a body is sent as POST unless a non-GET method was asked for. A
//! device that declares `post_data`, even an empty map, defaults to POST.
//!
//! Sending is fire-and-forget: a transport failure is logged, never
//! returned.

use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

use crate::app::ports::{HttpPort, HttpRequest};
use crate::config::{ActionSpec, HttpConfig};
use crate::error::ActionError;

pub struct HttpOutput {
    defaults: HttpConfig,
    transport: Arc<dyn HttpPort>,
}

impl HttpOutput {
    pub fn new(defaults: HttpConfig, transport: Arc<dyn HttpPort>) -> Self {
        Self {
            defaults,
            transport,
        }
    }

    /// Method used when neither the device nor the action names one.
    pub fn default_method(&self) -> String {
        match (&self.defaults.method, &self.defaults.post_data) {
            (Some(method), _) => method.to_ascii_lowercase(),
            (None, Some(_)) => "post".into(),
            _ => "get".into(),
        }
    }

    /// Merge device defaults with the action's overrides.
    pub fn request(&self, device: &str, spec: &ActionSpec) -> Result<HttpRequest, ActionError> {
        let url = spec
            .url
            .as_ref()
            .or(self.defaults.url.as_ref())
            .ok_or_else(|| ActionError::MissingField {
                device: device.to_owned(),
                field: "url",
            })?
            .clone();

        let mut body = self.defaults.post_data.clone().unwrap_or_default();
        if let Some(extra) = &spec.post_data {
            for (key, value) in extra {
                body.insert(key.clone(), value.clone());
            }
        }

        let mut method = match &spec.method {
            Some(method) => method.to_ascii_uppercase(),
            None => self.default_method().to_ascii_uppercase(),
        };
        if !body.is_empty() && method == "GET" {
            method = "POST".into();
        }

        let mut headers = Vec::new();
        if let Some(token) = spec.bearer_token.as_ref().or(self.defaults.bearer_token.as_ref()) {
            headers.push(("Authorization".to_owned(), format!("Bearer {token}")));
        }
        let body = if body.is_empty() {
            None
        } else {
            headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
            Some(Value::Object(body))
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    pub(super) fn action(&self, device: &str, spec: &ActionSpec) -> Result<(), ActionError> {
        let request = self.request(device, spec)?;
        info!("{}: {} {}", device, request.method, request.url);
        if let Err(e) = self.transport.send(&request) {
            warn!("{}: request to {} failed: {}", device, request.url, e);
        }
        Ok(())
    }
}
