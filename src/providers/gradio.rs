use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::MtProvider;
use crate::error::ProviderError;
use crate::lang::{Direction, TRUKU_TAG, ZH_TAG};

pub const DEFAULT_GRADIO_ENDPOINT: &str = "https://ithuan-formosan-translation.hf.space";

/// Client for the formosan-translation Space via Gradio's two-step REST protocol.
pub struct GradioMtProvider {
    client: reqwest::blocking::Client,
    base: String,
    ethnicity: String,
}

#[derive(Serialize)]
struct CallRequest<'a> {
    data: Vec<&'a str>,
}

#[derive(Deserialize)]
struct CallResponse {
    event_id: String,
}

impl GradioMtProvider {
    pub fn new(base: &str, ethnicity: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            ethnicity: ethnicity.into(),
        })
    }

    fn call(&self, api: &str, data: Vec<&str>) -> Result<Value, ProviderError> {
        let url = format!("{}/gradio_api/call/{}", self.base, api);
        debug!(%url, "gradio call");
        let resp = self.client.post(&url).json(&CallRequest { data }).send()?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }
        let CallResponse { event_id } = resp.json()?;

        let resp = self.client.get(format!("{url}/{event_id}")).send()?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }
        parse_sse_result(&resp.text()?)
    }
}

fn mode_api(direction: Direction) -> &'static str {
    match direction {
        Direction::ZhToTruku => "lambda_1",
        Direction::TrukuToZh => "lambda",
    }
}

fn translate_api(source_tag: &str) -> &'static str {
    if source_tag == ZH_TAG {
        "translate_1"
    } else {
        "translate"
    }
}

impl MtProvider for GradioMtProvider {
    fn configure(&self, direction: Direction) -> Result<(), ProviderError> {
        self.call(mode_api(direction), vec![self.ethnicity.as_str()])?;
        Ok(())
    }

    /// The Space always takes the language pair as (Mandarin, Truku); the endpoint name selects
    /// which way it translates.
    fn translate(&self, text: &str, source_tag: &str, _target_tag: &str) -> Result<String, ProviderError> {
        let out = self.call(translate_api(source_tag), vec![text, ZH_TAG, TRUKU_TAG])?;
        match out {
            Value::Array(items) => match items.into_iter().next() {
                Some(Value::String(s)) => Ok(s.trim().to_string()),
                other => Err(ProviderError::Response(format!("unexpected output: {other:?}"))),
            },
            other => Err(ProviderError::Response(format!("unexpected output: {other}"))),
        }
    }
}

/// Extracts the `data` payload of the `complete` event from a Gradio SSE body.
pub fn parse_sse_result(body: &str) -> Result<Value, ProviderError> {
    let mut event = "";
    let mut data = String::new();
    for line in body.lines().chain(std::iter::once("")) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            match event {
                "complete" => return Ok(serde_json::from_str(&data)?),
                "error" => {
                    let msg = data.trim();
                    let msg = if msg.is_empty() || msg == "null" {
                        "remote reported an error".to_string()
                    } else {
                        msg.to_string()
                    };
                    return Err(ProviderError::Remote(msg));
                }
                _ => {}
            }
            event = "";
            data.clear();
        } else if let Some(v) = line.strip_prefix("event:") {
            event = v.trim();
        } else if let Some(v) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(v.trim_start());
        }
    }
    Err(ProviderError::Response("stream ended without a complete event".to_string()))
}

#[cfg(test)]
mod tests {
    use super::{mode_api, parse_sse_result, translate_api};
    use crate::error::ProviderError;
    use crate::lang::Direction;

    #[test]
    fn complete_event_payload_is_returned() {
        let body = "event: generating\ndata: null\n\nevent: heartbeat\ndata: null\n\nevent: complete\ndata: [\"Kia su hug\"]\n\n";
        let v = parse_sse_result(body).expect("complete");
        assert_eq!(v[0], "Kia su hug");
    }

    #[test]
    fn trailing_event_without_blank_line_is_read() {
        let v = parse_sse_result("event: complete\r\ndata: [\"ok\"]").expect("complete");
        assert_eq!(v[0], "ok");
    }

    #[test]
    fn error_event_is_reported() {
        let err = parse_sse_result("event: error\ndata: null\n\n").unwrap_err();
        assert!(matches!(err, ProviderError::Remote(_)));
    }

    #[test]
    fn missing_complete_event_is_an_error() {
        let err = parse_sse_result("event: heartbeat\ndata: null\n\n").unwrap_err();
        assert!(matches!(err, ProviderError::Response(_)));
    }

    #[test]
    fn endpoints_follow_direction() {
        assert_eq!(mode_api(Direction::ZhToTruku), "lambda_1");
        assert_eq!(mode_api(Direction::TrukuToZh), "lambda");
        assert_eq!(translate_api(Direction::ZhToTruku.source_tag()), "translate_1");
        assert_eq!(translate_api(Direction::TrukuToZh.source_tag()), "translate");
    }
}
