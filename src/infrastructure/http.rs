use crate::types::{RtError, error::Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Delivery status returned by the REST publish endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStatus {
    pub message_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// REST calls that sit beside the socket: server lookup and message publishing
pub struct RestClient {
    api_url: String,
    app_id: String,
    api_key: String,
    http: reqwest::Client,
}

impl RestClient {
    pub fn new(api_url: &str, app_id: &str, api_key: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn app_base(&self) -> String {
        format!("{}/{}/{}", self.api_url, self.app_id, self.api_key)
    }

    pub fn lookup_url(&self) -> String {
        format!("{}/rt/lookup", self.app_base())
    }

    /// The channel name is a single path segment, percent-encoded
    pub fn publish_url(&self, channel: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)?;
        url.path_segments_mut()
            .map_err(|_| RtError::Config(format!("API URL cannot be a base: {}", self.api_url)))?
            .pop_if_empty()
            .extend([
                self.app_id.as_str(),
                self.api_key.as_str(),
                "messaging",
                channel,
            ]);
        Ok(url)
    }

    /// Asks the API which realtime server serves this application
    pub async fn lookup_rt_url(&self) -> Result<String> {
        let response = self
            .http
            .get(self.lookup_url())
            .send()
            .await
            .map_err(|e| RtError::Connection(format!("Realtime lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RtError::Connection(format!(
                "Realtime lookup failed with status: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let url = parse_lookup_body(&body)?;
        tracing::debug!("Realtime lookup resolved to {}", url);
        Ok(url)
    }

    /// Publishes a message to a channel via HTTP POST
    pub async fn publish(
        &self,
        channel: &str,
        message: Value,
        headers: Option<HashMap<String, String>>,
    ) -> Result<PublishStatus> {
        let mut body = serde_json::json!({ "message": message });
        if let Some(headers) = headers {
            body["headers"] = serde_json::to_value(headers)?;
        }

        let response = self
            .http
            .post(self.publish_url(channel)?)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RtError::Connection(format!("HTTP publish failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RtError::Connection(format!(
                "HTTP publish to channel '{}' failed with status: {}",
                channel,
                response.status()
            )));
        }

        let status: PublishStatus = response.json().await?;
        tracing::debug!(
            "Published message {} to {}: {}",
            status.message_id,
            channel,
            status.status
        );
        Ok(status)
    }
}

/// The lookup endpoint answers with a JSON string or a bare URL
pub fn parse_lookup_body(body: &str) -> Result<String> {
    let trimmed = body.trim();
    let url = match serde_json::from_str::<String>(trimmed) {
        Ok(url) => url,
        Err(_) => trimmed.to_string(),
    };

    if url.is_empty() {
        return Err(RtError::Connection(
            "Realtime lookup returned an empty address".to_string(),
        ));
    }
    Ok(url)
}

/// Converts an HTTP endpoint to its WebSocket equivalent
pub fn http_to_ws_endpoint(endpoint: &str) -> String {
    if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        endpoint.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_layout() {
        let rest = RestClient::new("https://api.backendless.com/", "APP", "KEY");
        assert_eq!(
            rest.lookup_url(),
            "https://api.backendless.com/APP/KEY/rt/lookup"
        );
        assert_eq!(
            rest.publish_url("default").unwrap().as_str(),
            "https://api.backendless.com/APP/KEY/messaging/default"
        );
    }

    #[test]
    fn test_publish_url_encodes_channel_name() {
        let rest = RestClient::new("https://api.backendless.com", "APP", "KEY");
        let url = rest.publish_url("rooms/1?x#y").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.backendless.com/APP/KEY/messaging/rooms%2F1%3Fx%23y"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_publish_url_keeps_api_path_prefix() {
        let rest = RestClient::new("http://localhost:8080/api/", "APP", "KEY");
        assert_eq!(
            rest.publish_url("default").unwrap().as_str(),
            "http://localhost:8080/api/APP/KEY/messaging/default"
        );
    }

    #[test]
    fn test_parse_lookup_body() {
        assert_eq!(
            parse_lookup_body(r#""https://rt.example.com:5000""#).unwrap(),
            "https://rt.example.com:5000"
        );
        assert_eq!(
            parse_lookup_body("https://rt.example.com\n").unwrap(),
            "https://rt.example.com"
        );
        assert!(parse_lookup_body("  ").is_err());
        assert!(parse_lookup_body(r#""""#).is_err());
    }

    #[test]
    fn test_http_to_ws_endpoint() {
        assert_eq!(http_to_ws_endpoint("https://rt.example.com"), "wss://rt.example.com");
        assert_eq!(http_to_ws_endpoint("http://localhost:5000"), "ws://localhost:5000");
        assert_eq!(http_to_ws_endpoint("ws://localhost:5000"), "ws://localhost:5000");
    }

    #[test]
    fn test_publish_status_decoding() {
        let status: PublishStatus = serde_json::from_str(
            r#"{"messageId":"m-1","status":"scheduled","errorMessage":null}"#,
        )
        .unwrap();
        assert_eq!(status.message_id, "m-1");
        assert_eq!(status.status, "scheduled");
        assert_eq!(status.error_message, None);
    }
}
