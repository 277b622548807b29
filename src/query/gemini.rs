// Copyright 2022 Florian Eich <florian.eich@gmail.com>
//
// This work is licensed under the Apache License, Version 2.0. You should have
// received a copy of this license along with the source code. If that is not
// the case, please find one at http://www.apache.org/licenses/LICENSE-2.0.

use super::{prompt,
            response::{parse_json_from_text, GenerateResponse, RawScan},
            ContextQuery, QueryRequest};
use crate::model::ScanResult;

use async_trait::async_trait;
use derivative::Derivative;
use eyre::{bail, Result, WrapErr};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};


#[derive(Derivative, Deserialize)]
#[derivative(Debug)]
#[serde(default)]
/// [`ContextQuery`] backed by the Gemini `generateContent` REST endpoint with
/// the maps and search tools enabled. Deserialized from the `[query]` section
/// of the config file, then [`init`](GeminiClient::init)ialized with the live
/// credential handle.
pub struct GeminiClient {
  endpoint:     String,
  model:        String,
  timeout_secs: u64,
  #[serde(skip)]
  #[derivative(Debug = "ignore")]
  http:         Option<reqwest::Client>,
  #[serde(skip)]
  #[derivative(Debug = "ignore")]
  api_key:      Option<watch::Receiver<String>>,
}

impl Default for GeminiClient {
  fn default() -> Self {
    Self { endpoint:     "https://generativelanguage.googleapis.com/v1beta".into(),
           model:        "gemini-2.5-flash".into(),
           timeout_secs: 90,
           http:         None,
           api_key:      None, }
  }
}

impl GeminiClient {
  /// Builds the HTTP client and attaches the credential handle. The key is
  /// read anew on every request, so updates take effect immediately.
  pub fn init(mut self, api_key: watch::Receiver<String>) -> Result<Self> {
    let http = reqwest::Client::builder()
                 .timeout(Duration::from_secs(self.timeout_secs))
                 .build()
                 .wrap_err("unable to build HTTP client")?;

    self.http = Some(http);
    self.api_key = Some(api_key);
    Ok(self)
  }

  fn url(&self) -> String {
    format!("{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model)
  }

  async fn generate(&self,
                    http: &reqwest::Client,
                    api_key: &str,
                    request: &QueryRequest)
                    -> Result<ScanResult> {
    let response = http.post(self.url())
                       .header("x-goog-api-key", api_key)
                       .json(&request_body(request))
                       .send()
                       .await
                       .wrap_err("request to Gemini failed")?;

    let status = response.status();
    if !status.is_success() {
      let detail = response.text().await.unwrap_or_default();
      bail!("Gemini answered {}: {}", status, detail);
    }

    let response: GenerateResponse =
      response.json().await.wrap_err("malformed Gemini response")?;
    let text = response.text();
    debug!(%text, "model answer");

    let raw = RawScan::from_value(parse_json_from_text(&text)?);
    if request.emergency {
      Ok(raw.into_emergency_result())
    } else {
      Ok(raw.into_scan_result(response.grounding_urls()))
    }
  }
}

#[async_trait]
impl ContextQuery for GeminiClient {
  /// Refuses with an error when uninitialized or without a credential. Any
  /// transport, status or parse problem yields the connection error result.
  async fn query(&self, request: QueryRequest) -> Result<ScanResult> {
    let (http, api_key) = match (&self.http, &self.api_key) {
      (Some(http), Some(api_key)) => (http, api_key.borrow().clone()),
      _ => bail!("GeminiClient not initialized, aborting"),
    };
    if api_key.trim().is_empty() {
      bail!("API key missing");
    }

    match self.generate(http, api_key.trim(), &request).await {
      Ok(result) => Ok(result),
      Err(e) => {
        warn!("Gemini query failed: {:#}", e);
        Ok(ScanResult::connection_error())
      }
    }
  }
}


/// JSON body of a `generateContent` call. Emergency requests only get the
/// maps tool.
fn request_body(request: &QueryRequest) -> Value {
  let contents = json!([{ "role": "user",
                          "parts": [{ "text": prompt::build(request) }] }]);

  if request.emergency {
    return json!({ "contents": contents,
                   "tools": [{ "googleMaps": {} }] });
  }

  json!({ "contents": contents,
          "tools": [{ "googleMaps": {} }, { "googleSearch": {} }],
          "toolConfig": {
            "retrievalConfig": {
              "latLng": { "latitude": request.sample.latitude,
                          "longitude": request.sample.longitude }
            }
          } })
}

// fin --------------------------------------------------------------------- //

#[cfg(test)]
mod tests {
  use super::{request_body, GeminiClient};
  use crate::{model::{CoordinateSample, ScanResult, SearchPreferences},
              query::{ContextQuery, QueryRequest}};

  use indoc::indoc;
  use pretty_assertions::assert_eq;
  use serde_json::json;
  use tokio::sync::watch;
  use wildmatch::WildMatch;


  fn request() -> QueryRequest {
    QueryRequest { sample:           CoordinateSample::new(40.5, -4.25),
                   preferences:      SearchPreferences::default(),
                   extended_search:  false,
                   scan_traffic_now: true,
                   scan_weather_now: true,
                   emergency:        false, }
  }

  #[test]
  fn config_test() {
    let client: GeminiClient = toml::from_str(indoc! {r#"
      endpoint = "http://localhost:8080/v1beta/"
      timeout_secs = 5
    "#}).unwrap();

    assert_eq!(client.url(),
               "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent");
    assert_eq!(client.timeout_secs, 5);
    assert!(client.http.is_none());
  }

  #[test]
  fn debug_hides_credential_test() {
    let (_, key_rx) = watch::channel("secret".to_owned());
    let client = GeminiClient::default().init(key_rx).unwrap();
    let debug = format!("{:?}", client);

    assert!(WildMatch::new("GeminiClient { endpoint: \"https://*\", model: \
                            \"gemini-2.5-flash\", timeout_secs: 90 }")
                                                                      .matches(&debug));
    assert!(!debug.contains("secret"));
  }

  #[test]
  fn request_body_test() {
    let body = request_body(&request());

    assert_eq!(body["tools"],
               json!([{ "googleMaps": {} }, { "googleSearch": {} }]));
    assert_eq!(body["toolConfig"]["retrievalConfig"]["latLng"],
               json!({ "latitude": 40.5, "longitude": -4.25 }));
    assert!(body["contents"][0]["parts"][0]["text"].as_str()
                                                   .unwrap()
                                                   .contains("Lat 40.5, Lng -4.25"));
  }

  #[test]
  fn emergency_body_test() {
    let request = QueryRequest::emergency(CoordinateSample::new(40.5, -4.25),
                                          SearchPreferences::default());
    let body = request_body(&request);

    assert_eq!(body["tools"], json!([{ "googleMaps": {} }]));
    assert!(body.get("toolConfig").is_none());
  }

  #[tokio::test]
  async fn uninitialized_test() {
    let client = GeminiClient::default();
    assert!(client.query(request()).await.is_err());
  }

  #[tokio::test]
  async fn missing_key_test() {
    let (_, key_rx) = watch::channel("  ".to_owned());
    let client = GeminiClient::default().init(key_rx).unwrap();

    assert!(client.query(request()).await.is_err());
  }

  #[tokio::test]
  async fn unreachable_endpoint_test() {
    let (_, key_rx) = watch::channel("key".to_owned());
    let client = GeminiClient { endpoint: "http://127.0.0.1:9".into(),
                                timeout_secs: 5,
                                ..Default::default() };
    let client = client.init(key_rx).unwrap();

    assert_eq!(client.query(request()).await.unwrap(),
               ScanResult::connection_error());
  }
}
