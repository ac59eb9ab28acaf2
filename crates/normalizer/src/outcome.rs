use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed result of normalizing one model reply.
///
/// Serialized with a `type` discriminant and camelCase fields, so a serialized outcome carries
/// the same field names the classifier looks for and re-normalizes to the same variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outcome {
    #[serde(rename_all = "camelCase")]
    InjectionReport {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        injection_points: Vec<InjectionPoint>,
    },

    #[serde(rename_all = "camelCase")]
    PayloadReport {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        payloads: Vec<String>,
    },

    #[serde(rename_all = "camelCase")]
    CombinedReport {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        injection_points: Vec<InjectionPoint>,
        payloads: Vec<String>,
    },

    /// `confidence` is passed through as produced by the model; it is not clamped to 0-100 and
    /// non-numeric values are kept as text.
    #[serde(rename_all = "camelCase")]
    AnalysisVerdict {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        verdict: Verdict,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<Confidence>,
        #[serde(default)]
        evidence: Vec<String>,
    },

    /// Terminal fallback: the reply could not be read as one of the structured reports.
    #[serde(rename_all = "camelCase")]
    FreeText {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parse_error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

impl Outcome {
    /// Wire name of the variant (the serialized `type` tag).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InjectionReport { .. } => "injectionReport",
            Self::PayloadReport { .. } => "payloadReport",
            Self::CombinedReport { .. } => "combinedReport",
            Self::AnalysisVerdict { .. } => "analysisVerdict",
            Self::FreeText { .. } => "freeText",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionPoint {
    pub name: String,
    pub location: String,
    pub risk: Risk,
    pub reason: String,
}

/// Risk level reported for an injection point.
///
/// Known levels are matched case-insensitively; anything else is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Risk {
    High,
    Medium,
    Low,
    Other(String),
}

impl From<String> for Risk {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            "LOW" => Self::Low,
            _ => Self::Other(value),
        }
    }
}

impl From<Risk> for String {
    fn from(value: Risk) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("HIGH"),
            Self::Medium => f.write_str("MEDIUM"),
            Self::Low => f.write_str("LOW"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Outcome of a tested payload as judged by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Success,
    Failure,
    Suspicious,
    Other(String),
}

impl From<String> for Verdict {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "failure" => Self::Failure,
            "suspicious" => Self::Suspicious,
            _ => Self::Other(value),
        }
    }
}

impl From<Verdict> for String {
    fn from(value: Verdict) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failure => f.write_str("failure"),
            Self::Suspicious => f.write_str("suspicious"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Model-reported confidence. Numbers are kept exactly as parsed; anything else stays text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Number(serde_json::Number),
    Other(String),
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// An [`Outcome`] plus the advisories collected while producing it.
///
/// Warnings never mean failure: they note that the payload was repaired or may be incomplete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalized {
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Normalized {
    /// All warnings folded into the single `warning` string the HTTP envelope carries.
    pub fn warning(&self) -> Option<String> {
        if self.warnings.is_empty() {
            return None;
        }
        Some(self.warnings.join(" "))
    }
}
