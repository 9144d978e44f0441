//! TensorFlow Serving REST client.
//!
//! Requests use the columnar `inputs` format. String tensors whose name ends
//! in `_bytes` travel base64-encoded as `{"b64": ...}` objects, which is how
//! TF Serving distinguishes binary payloads from text.

use super::InferenceBackend;
use crate::config::InferenceConfig;
use crate::tensor::{NamedTensor, TensorData};
use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub struct TfServingBackend {
    client: reqwest::Client,
    predict_url: String,
    status_url: String,
    signature_name: String,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    signature_name: &'a str,
    inputs: Map<String, Value>,
}

#[derive(Deserialize)]
struct PredictResponse {
    outputs: Value,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct ModelStatusResponse {
    #[serde(default)]
    model_version_status: Vec<ModelVersionStatus>,
}

#[derive(Deserialize)]
struct ModelVersionStatus {
    version: String,
    state: String,
}

impl TfServingBackend {
    pub fn connect(
        base_url: &str,
        model_name: &str,
        signature_name: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        let base_url = base_url.trim_end_matches('/');
        let status_url = format!("{base_url}/v1/models/{model_name}");
        let predict_url = format!("{status_url}:predict");

        tracing::info!(%predict_url, signature_name, "Using TensorFlow Serving backend");

        Ok(Self {
            client,
            predict_url,
            status_url,
            signature_name: signature_name.to_string(),
        })
    }

    pub fn from_config(config: &InferenceConfig) -> anyhow::Result<Self> {
        Self::connect(
            &config.model_server_url,
            &config.model_name,
            &config.signature_name,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    async fn error_message(response: reqwest::Response) -> String {
        let text = response.text().await.unwrap_or_default();
        serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text)
    }
}

impl InferenceBackend for TfServingBackend {
    #[tracing::instrument(skip_all, fields(inputs = inputs.len()))]
    async fn infer(&self, inputs: Vec<NamedTensor>) -> anyhow::Result<Vec<NamedTensor>> {
        let request = PredictRequest {
            signature_name: &self.signature_name,
            inputs: inputs
                .iter()
                .map(|t| (t.name().to_string(), tensor_to_json(t)))
                .collect(),
        };

        let response = self
            .client
            .post(&self.predict_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("predict request to {} failed", self.predict_url))?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response).await;
            anyhow::bail!("model server returned {status}: {message}");
        }

        let body: PredictResponse = response
            .json()
            .await
            .context("model server returned an unreadable predict response")?;

        parse_outputs(body.outputs)
    }

    async fn ready(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .get(&self.status_url)
            .send()
            .await
            .with_context(|| format!("status request to {} failed", self.status_url))?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response).await;
            anyhow::bail!("model status returned {status}: {message}");
        }

        let body: ModelStatusResponse = response
            .json()
            .await
            .context("unreadable model status response")?;

        match body
            .model_version_status
            .iter()
            .find(|v| v.state == "AVAILABLE")
        {
            Some(v) => {
                tracing::debug!(version = %v.version, "Model version available");
                Ok(())
            }
            None => anyhow::bail!("no model version is AVAILABLE yet"),
        }
    }
}

/// JSON encoding of one input tensor, nested to its shape.
pub(crate) fn tensor_to_json(tensor: &NamedTensor) -> Value {
    let binary = tensor.name().ends_with("_bytes");
    match tensor.data() {
        TensorData::Bytes(a) => nest(a.view(), &|bytes: &Vec<u8>| bytes_to_json(bytes, binary)),
        TensorData::Float(a) => nest(a.view(), &|v: &f32| {
            serde_json::Number::from_f64(f64::from(*v))
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }),
        TensorData::Int(a) => nest(a.view(), &|v: &i64| Value::from(*v)),
    }
}

fn bytes_to_json(bytes: &[u8], binary: bool) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) if !binary => Value::String(text.to_string()),
        _ => serde_json::json!({ "b64": STANDARD.encode(bytes) }),
    }
}

fn nest<T>(view: ArrayViewD<'_, T>, leaf: &dyn Fn(&T) -> Value) -> Value {
    if view.ndim() == 0 {
        return view.iter().next().map(leaf).unwrap_or(Value::Null);
    }
    Value::Array(view.outer_iter().map(|sub| nest(sub, leaf)).collect())
}

/// Named tensors from the `outputs` member of a predict response.
pub(crate) fn parse_outputs(outputs: Value) -> anyhow::Result<Vec<NamedTensor>> {
    match outputs {
        Value::Object(map) => map
            .into_iter()
            .map(|(name, value)| {
                let data = json_to_tensor(&value)
                    .with_context(|| format!("output `{name}` is not a valid tensor"))?;
                Ok(NamedTensor::new(name, data))
            })
            .collect(),
        _ => anyhow::bail!(
            "model returned a single unnamed output; a signature with named outputs is required"
        ),
    }
}

/// Decode a nested JSON array into a tensor. Numbers become float32,
/// strings and `{"b64": ...}` objects become byte strings.
pub(crate) fn json_to_tensor(value: &Value) -> anyhow::Result<TensorData> {
    let mut shape = Vec::new();
    let mut probe = value;
    while let Value::Array(items) = probe {
        shape.push(items.len());
        match items.first() {
            Some(first) => probe = first,
            None => break,
        }
    }

    let mut leaves = Vec::with_capacity(shape.iter().product());
    flatten(value, &shape, 0, &mut leaves)?;

    let shape = IxDyn(&shape);
    match leaves.first() {
        None | Some(Value::Number(_)) | Some(Value::Null) => {
            let data = leaves
                .iter()
                .map(|leaf| match leaf {
                    Value::Number(n) => n
                        .as_f64()
                        .map(|v| v as f32)
                        .context("number out of range"),
                    Value::Null => Ok(f32::NAN),
                    other => anyhow::bail!("mixed element types: {other}"),
                })
                .collect::<anyhow::Result<Vec<f32>>>()?;
            Ok(TensorData::Float(ArrayD::from_shape_vec(shape, data)?))
        }
        Some(_) => {
            let data = leaves
                .iter()
                .map(|leaf| json_to_bytes(leaf))
                .collect::<anyhow::Result<Vec<Vec<u8>>>>()?;
            Ok(TensorData::Bytes(ArrayD::from_shape_vec(shape, data)?))
        }
    }
}

fn flatten<'v>(
    value: &'v Value,
    shape: &[usize],
    depth: usize,
    leaves: &mut Vec<&'v Value>,
) -> anyhow::Result<()> {
    match value {
        Value::Array(items) => {
            if depth >= shape.len() || items.len() != shape[depth] {
                anyhow::bail!("ragged array at depth {depth}");
            }
            for item in items {
                flatten(item, shape, depth + 1, leaves)?;
            }
            Ok(())
        }
        leaf => {
            if depth != shape.len() {
                anyhow::bail!("ragged array at depth {depth}");
            }
            leaves.push(leaf);
            Ok(())
        }
    }
}

fn json_to_bytes(value: &Value) -> anyhow::Result<Vec<u8>> {
    match value {
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Object(obj) => {
            let encoded = obj
                .get("b64")
                .and_then(Value::as_str)
                .context("object element without a `b64` string")?;
            Ok(STANDARD.decode(encoded)?)
        }
        other => anyhow::bail!("mixed element types: {other}"),
    }
}
