//! Decoding of raw provider bodies.
//!
//! The provider answers on a single endpoint with one of two shapes: a weather
//! report, or an error envelope such as
//!
//! ```json
//! { "success": false, "error": { "code": 105, "type": "https_access_restricted", "info": "..." } }
//! ```
//!
//! [`decode`] tries the report shape first and falls back to the error shape.
//! A body matching neither is a [`DecodeFailure`]; nothing is defaulted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields of a successful report the rest of the crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessPayload {
    pub name: String,
    pub country: String,
    pub temperature: i32,
    /// Raw `yyyy-MM-dd HH:mm` text; parsed later by the caller.
    pub local_time: String,
}

/// The provider explicitly declined the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderErrorPayload {
    pub code: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub info: String,
}

impl fmt::Display for ProviderErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.kind, self.info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResponse {
    Success(SuccessPayload),
    Rejected(ProviderErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("response matched neither the report nor the error shape: {reason}")]
pub struct DecodeFailure {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct WsLocation {
    name: String,
    country: String,
    localtime: String,
}

#[derive(Debug, Deserialize)]
struct WsCurrent {
    temperature: i32,
}

#[derive(Debug, Deserialize)]
struct WsReport {
    location: WsLocation,
    current: WsCurrent,
}

#[derive(Debug, Deserialize)]
struct WsErrorEnvelope {
    error: ProviderErrorPayload,
}

pub fn decode(body: &str) -> Result<ProviderResponse, DecodeFailure> {
    let report_err = match serde_json::from_str::<WsReport>(body) {
        Ok(report) => {
            return Ok(ProviderResponse::Success(SuccessPayload {
                name: report.location.name,
                country: report.location.country,
                temperature: report.current.temperature,
                local_time: report.location.localtime,
            }));
        }
        Err(err) => err,
    };

    match serde_json::from_str::<WsErrorEnvelope>(body) {
        Ok(envelope) => Ok(ProviderResponse::Rejected(envelope.error)),
        Err(err) => Err(DecodeFailure {
            reason: format!("as report: {report_err}; as error: {err}"),
        }),
    }
}
