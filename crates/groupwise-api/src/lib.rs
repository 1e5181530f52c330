//! Wire contract for the groupwise comparison service: request validation,
//! the error taxonomy with its HTTP status mapping, response shaping, and
//! the OpenAPI document.

use groupwise_stats::{ComparisonReport, GroupSet, StatsError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const CRATE_NAME: &str = "groupwise-api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidRequestBody,
    TooFewGroups,
    GroupTooSmall,
    TooManyGroups,
    TooManySamples,
    PayloadTooLarge,
    DegenerateVariance,
    Timeout,
    Internal,
}

impl ApiErrorCode {
    /// HTTP status the error surfaces with. Validation failures are the
    /// caller's fault (400), degenerate computation is 422, timeout 504.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidRequestBody
            | Self::TooFewGroups
            | Self::GroupTooSmall
            | Self::TooManyGroups
            | Self::TooManySamples => 400,
            Self::PayloadTooLarge => 413,
            Self::DegenerateVariance => 422,
            Self::Timeout => 504,
            Self::Internal => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn invalid_body(message: &str) -> Self {
        Self {
            code: ApiErrorCode::InvalidRequestBody,
            message: format!("invalid request body: {message}"),
            details: json!({}),
        }
    }

    #[must_use]
    pub fn invalid_sample(label: &str, index: usize) -> Self {
        Self {
            code: ApiErrorCode::InvalidRequestBody,
            message: format!("group {label} sample {index} is not a finite number"),
            details: json!({"group": label, "index": index}),
        }
    }

    #[must_use]
    pub fn too_many_groups(count: usize, limit: usize) -> Self {
        Self {
            code: ApiErrorCode::TooManyGroups,
            message: format!("too many groups: {count} exceeds limit {limit}"),
            details: json!({"count": count, "limit": limit}),
        }
    }

    #[must_use]
    pub fn too_many_samples(label: &str, count: usize, limit: usize) -> Self {
        Self {
            code: ApiErrorCode::TooManySamples,
            message: format!("group {label} has {count} samples, limit is {limit}"),
            details: json!({"group": label, "count": count, "limit": limit}),
        }
    }

    #[must_use]
    pub fn payload_too_large(bytes: usize, limit: usize) -> Self {
        Self {
            code: ApiErrorCode::PayloadTooLarge,
            message: format!("request body of {bytes} bytes exceeds limit {limit}"),
            details: json!({"bytes": bytes, "limit": limit}),
        }
    }

    #[must_use]
    pub fn timeout(limit_ms: u64) -> Self {
        Self {
            code: ApiErrorCode::Timeout,
            message: format!("comparison did not finish within {limit_ms} ms"),
            details: json!({"limit_ms": limit_ms}),
        }
    }

    #[must_use]
    pub fn internal(message: &str) -> Self {
        Self {
            code: ApiErrorCode::Internal,
            message: message.to_string(),
            details: json!({}),
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.code.http_status()
    }
}

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        let message = err.to_string();
        match err {
            StatsError::TooFewGroups { count } => Self {
                code: ApiErrorCode::TooFewGroups,
                message: "at least two groups required".to_string(),
                details: json!({"count": count}),
            },
            StatsError::GroupTooSmall { label, count } => Self {
                code: ApiErrorCode::GroupTooSmall,
                message,
                details: json!({"group": label, "count": count}),
            },
            StatsError::DuplicateLabel { label } => Self {
                code: ApiErrorCode::InvalidRequestBody,
                message,
                details: json!({"group": label}),
            },
            StatsError::NonFiniteSample { label, index } => Self::invalid_sample(&label, index),
            StatsError::DegenerateVariance => Self {
                code: ApiErrorCode::DegenerateVariance,
                message,
                details: json!({}),
            },
            StatsError::InvalidSignificance { .. } | StatsError::Numeric(_) => {
                Self::internal(&message)
            }
            _ => Self::internal(&message),
        }
    }
}

/// Ceilings on accepted input, so the CPU-bound comparison cannot be fed
/// unbounded work.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    pub max_groups: usize,
    pub max_samples_per_group: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_groups: 64,
            max_samples_per_group: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompareRequest {
    groups: Map<String, Value>,
}

/// Parses and validates a `POST /anova` body into a [`GroupSet`].
///
/// Group iteration order is the order labels appear in the body
/// (`serde_json` is built with `preserve_order`), which fixes the order of
/// the Tukey rows in the response.
pub fn parse_compare_request(
    body: &[u8],
    limits: &ValidationLimits,
) -> Result<GroupSet, ApiError> {
    let request: CompareRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::invalid_body(&e.to_string()))?;

    if request.groups.len() > limits.max_groups {
        return Err(ApiError::too_many_groups(
            request.groups.len(),
            limits.max_groups,
        ));
    }

    let mut pairs = Vec::with_capacity(request.groups.len());
    for (label, value) in &request.groups {
        let raw = value.as_array().ok_or_else(|| {
            ApiError::invalid_body(&format!("group {label} must be an array of numbers"))
        })?;
        if raw.len() > limits.max_samples_per_group {
            return Err(ApiError::too_many_samples(
                label,
                raw.len(),
                limits.max_samples_per_group,
            ));
        }
        let mut samples = Vec::with_capacity(raw.len());
        for (index, entry) in raw.iter().enumerate() {
            let sample = entry
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ApiError::invalid_sample(label, index))?;
            samples.push(sample);
        }
        pairs.push((label.clone(), samples));
    }

    GroupSet::new(pairs).map_err(ApiError::from)
}

/// Shapes a [`ComparisonReport`] into the response body.
///
/// The `anova` object carries the F statistic and p-value plus the
/// sum-of-squares decomposition; `tukey` rows use the `p-adj` key.
#[must_use]
pub fn report_to_json(report: &ComparisonReport) -> Value {
    let tukey: Vec<Value> = report
        .tukey
        .iter()
        .map(|row| {
            json!({
                "group1": row.group1,
                "group2": row.group2,
                "meandiff": row.meandiff,
                "p-adj": row.p_adj,
                "lower": row.lower,
                "upper": row.upper,
                "reject": row.reject,
            })
        })
        .collect();
    json!({
        "anova": {
            "f": report.anova.f,
            "p": report.anova.p,
            "ss_between": report.anova.ss_between,
            "ss_within": report.anova.ss_within,
            "df_between": report.anova.df_between,
            "df_within": report.anova.df_within,
            "ms_between": report.anova.ms_between,
            "ms_within": report.anova.ms_within,
        },
        "tukey": tukey,
        "significance": report.significance,
    })
}

#[must_use]
pub fn openapi_v1_spec() -> Value {
    json!({
      "openapi": "3.0.3",
      "info": {
        "title": "groupwise API",
        "version": "v1"
      },
      "paths": {
        "/healthz": {"get": {"responses": {"200": {"description": "ok"}}}},
        "/readyz": {"get": {"responses": {"200": {"description": "ready"}, "503": {"description": "not ready"}}}},
        "/metrics": {"get": {"responses": {"200": {"description": "prometheus metrics"}}}},
        "/v1/version": {"get": {"responses": {"200": {"description": "version info"}}}},
        "/anova": {
          "post": {
            "requestBody": {
              "required": true,
              "content": {
                "application/json": {
                  "schema": {
                    "type": "object",
                    "required": ["groups"],
                    "additionalProperties": false,
                    "properties": {
                      "groups": {
                        "type": "object",
                        "minProperties": 2,
                        "additionalProperties": {
                          "type": "array",
                          "minItems": 2,
                          "items": {"type": "number"}
                        }
                      }
                    }
                  }
                }
              }
            },
            "responses": {
              "200": {"description": "comparison report"},
              "400": {"description": "invalid input", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "413": {"description": "payload too large", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "422": {"description": "degenerate variance", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "504": {"description": "computation timeout", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          }
        }
      },
      "components": {
        "schemas": {
          "ApiErrorCode": {
            "type": "string",
            "enum": [
              "InvalidRequestBody",
              "TooFewGroups",
              "GroupTooSmall",
              "TooManyGroups",
              "TooManySamples",
              "PayloadTooLarge",
              "DegenerateVariance",
              "Timeout",
              "Internal"
            ]
          },
          "ApiError": {
            "type": "object",
            "required": ["code", "message", "details"],
            "additionalProperties": false,
            "properties": {
              "code": {"$ref": "#/components/schemas/ApiErrorCode"},
              "message": {"type": "string"},
              "details": {"type": "object"}
            }
          }
        }
      }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<GroupSet, ApiError> {
        parse_compare_request(body.as_bytes(), &ValidationLimits::default())
    }

    #[test]
    fn parse_valid_body_preserves_group_order() {
        let set = parse(r#"{"groups": {"z": [1, 2.5], "a": [3, 4]}}"#).expect("valid body");
        let labels: Vec<&str> = set.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["z", "a"]);
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = parse("{not json").expect_err("malformed");
        assert_eq!(err.code, ApiErrorCode::InvalidRequestBody);
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn parse_rejects_unknown_top_level_fields() {
        let err =
            parse(r#"{"groups": {"a": [1, 2], "b": [3, 4]}, "extra": 1}"#).expect_err("extra");
        assert_eq!(err.code, ApiErrorCode::InvalidRequestBody);
    }

    #[test]
    fn parse_rejects_single_group() {
        let err = parse(r#"{"groups": {"a": [1, 2, 3]}}"#).expect_err("one group");
        assert_eq!(err.code, ApiErrorCode::TooFewGroups);
        assert_eq!(err.message, "at least two groups required");
    }

    #[test]
    fn parse_rejects_non_numeric_sample() {
        let err = parse(r#"{"groups": {"a": [1, "x"], "b": [3, 4]}}"#).expect_err("bad sample");
        assert_eq!(err.code, ApiErrorCode::InvalidRequestBody);
        assert_eq!(err.details["group"], "a");
        assert_eq!(err.details["index"], 1);
    }

    #[test]
    fn parse_rejects_non_array_group() {
        let err = parse(r#"{"groups": {"a": 7, "b": [3, 4]}}"#).expect_err("not an array");
        assert_eq!(err.code, ApiErrorCode::InvalidRequestBody);
    }

    #[test]
    fn parse_rejects_undersized_group() {
        let err = parse(r#"{"groups": {"a": [1], "b": [3, 4]}}"#).expect_err("undersized");
        assert_eq!(err.code, ApiErrorCode::GroupTooSmall);
        assert_eq!(err.details["group"], "a");
    }

    #[test]
    fn parse_enforces_group_ceiling() {
        let limits = ValidationLimits {
            max_groups: 2,
            max_samples_per_group: 10,
        };
        let body = r#"{"groups": {"a": [1, 2], "b": [3, 4], "c": [5, 6]}}"#;
        let err = parse_compare_request(body.as_bytes(), &limits).expect_err("too many");
        assert_eq!(err.code, ApiErrorCode::TooManyGroups);
    }

    #[test]
    fn parse_enforces_sample_ceiling() {
        let limits = ValidationLimits {
            max_groups: 8,
            max_samples_per_group: 3,
        };
        let body = r#"{"groups": {"a": [1, 2, 3, 4], "b": [3, 4]}}"#;
        let err = parse_compare_request(body.as_bytes(), &limits).expect_err("too many samples");
        assert_eq!(err.code, ApiErrorCode::TooManySamples);
        assert_eq!(err.details["group"], "a");
    }

    #[test]
    fn status_mapping_is_stable() {
        assert_eq!(ApiErrorCode::TooFewGroups.http_status(), 400);
        assert_eq!(ApiErrorCode::PayloadTooLarge.http_status(), 413);
        assert_eq!(ApiErrorCode::DegenerateVariance.http_status(), 422);
        assert_eq!(ApiErrorCode::Timeout.http_status(), 504);
        assert_eq!(ApiErrorCode::Internal.http_status(), 500);
    }

    #[test]
    fn report_shape_uses_spec_keys() {
        let set = parse(r#"{"groups": {"A": [1, 2, 3], "B": [4, 5, 6]}}"#).expect("valid body");
        let report = groupwise_stats::compare(&set, 0.05).expect("compare");
        let value = report_to_json(&report);
        assert!(value["anova"]["f"].is_number());
        assert!(value["anova"]["p"].is_number());
        let row = &value["tukey"][0];
        assert!(row["p-adj"].is_number());
        assert!(row["meandiff"].is_number());
        assert!(row["reject"].is_boolean());
    }

    #[test]
    fn stats_degenerate_variance_maps_to_422() {
        let err = ApiError::from(StatsError::DegenerateVariance);
        assert_eq!(err.status(), 422);
    }
}
