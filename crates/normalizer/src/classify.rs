use crate::outcome::{Confidence, InjectionPoint, Normalized, Outcome, Risk, Verdict};
use serde_json::{Map, Number, Value};

/// Payload lists longer than this get an advisory; models are asked for 10-15.
pub const PAYLOAD_ADVISORY_THRESHOLD: usize = 20;

/// Map a parsed reply onto an [`Outcome`] by field presence.
///
/// `raw` is the unprocessed model reply, used verbatim when the shape is unrecognized.
/// `repair_warning` comes from the repair chain and is carried into the result. Never fails.
pub fn classify(value: &Value, raw: &str, repair_warning: Option<&str>) -> Normalized {
    let mut warnings: Vec<String> = repair_warning.map(str::to_string).into_iter().collect();

    let Some(map) = value.as_object() else {
        return Normalized {
            outcome: raw_free_text(raw),
            warnings,
        };
    };

    let explanation = map.get("explanation").map(text_of);
    let injection_points = map.get("injectionPoints");
    let payloads = map.get("payloads");

    let outcome = match (injection_points, payloads) {
        (Some(points), Some(payloads)) => Outcome::CombinedReport {
            explanation,
            injection_points: injection_points_of(points),
            payloads: strings_of(payloads),
        },
        (Some(points), None) => Outcome::InjectionReport {
            explanation,
            injection_points: injection_points_of(points),
        },
        (None, Some(payloads)) => {
            let payloads = strings_of(payloads);
            if payloads.len() > PAYLOAD_ADVISORY_THRESHOLD {
                warnings.push(format!(
                    "received {} payloads; the nominal cap is 10-15, so the list may be incomplete or truncated.",
                    payloads.len()
                ));
            }
            Outcome::PayloadReport {
                explanation,
                payloads,
            }
        }
        (None, None) => match map.get("verdict") {
            Some(verdict) => Outcome::AnalysisVerdict {
                explanation,
                verdict: Verdict::from(text_of(verdict)),
                confidence: map.get("confidence").and_then(confidence_of),
                evidence: map.get("evidence").map(strings_of).unwrap_or_default(),
            },
            None => match explanation {
                Some(explanation) => structured_message(explanation, map),
                None => raw_free_text(raw),
            },
        },
    };

    Normalized { outcome, warnings }
}

fn raw_free_text(raw: &str) -> Outcome {
    Outcome::FreeText {
        message: raw.to_string(),
        parse_error: None,
        hint: None,
    }
}

/// Explanation first, then every other string field as `key: value`.
fn structured_message(explanation: String, map: &Map<String, Value>) -> Outcome {
    let mut lines = vec![explanation];
    for (key, value) in map {
        if key == "explanation" {
            continue;
        }
        if let Some(text) = value.as_str() {
            lines.push(format!("{key}: {text}"));
        }
    }
    Outcome::FreeText {
        message: lines.join("\n"),
        parse_error: None,
        hint: None,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn strings_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(text_of).collect(),
        Value::Null => Vec::new(),
        single => vec![text_of(single)],
    }
}

/// Numbers and numeric strings (`"85"`, `"85%"`) become numbers; other values are kept as text.
fn confidence_of(value: &Value) -> Option<Confidence> {
    match value {
        Value::Null => None,
        Value::Number(number) => Some(Confidence::Number(number.clone())),
        Value::String(text) => {
            let digits = text.trim().trim_end_matches('%').trim_end();
            let number = digits
                .parse::<i64>()
                .ok()
                .map(Number::from)
                .or_else(|| digits.parse::<f64>().ok().and_then(Number::from_f64));
            Some(number.map_or_else(|| Confidence::Other(text.clone()), Confidence::Number))
        }
        other => Some(Confidence::Other(other.to_string())),
    }
}

fn injection_points_of(value: &Value) -> Vec<InjectionPoint> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            let field = |key: &str| item.get(key).map(text_of).unwrap_or_default();
            match item {
                Value::Object(_) => InjectionPoint {
                    name: field("name"),
                    location: field("location"),
                    risk: Risk::from(field("risk")),
                    reason: field("reason"),
                },
                other => InjectionPoint {
                    name: text_of(other),
                    location: String::new(),
                    risk: Risk::Other(String::new()),
                    reason: String::new(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn both_lists_make_a_combined_report() {
        let value = json!({
            "explanation": "id is numeric",
            "injectionPoints": [{"name": "id", "location": "query", "risk": "HIGH", "reason": "numeric"}],
            "payloads": ["1'", "1 OR 1=1"]
        });
        let normalized = classify(&value, "raw", None);
        assert_eq!(
            normalized.outcome,
            Outcome::CombinedReport {
                explanation: Some("id is numeric".to_string()),
                injection_points: vec![InjectionPoint {
                    name: "id".to_string(),
                    location: "query".to_string(),
                    risk: Risk::High,
                    reason: "numeric".to_string(),
                }],
                payloads: vec!["1'".to_string(), "1 OR 1=1".to_string()],
            }
        );
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn injection_points_alone() {
        let value = json!({"injectionPoints": [{"name": "q", "location": "body", "risk": "low"}]});
        let normalized = classify(&value, "raw", None);
        let Outcome::InjectionReport {
            explanation,
            injection_points,
        } = normalized.outcome
        else {
            panic!("expected injection report");
        };
        assert_eq!(explanation, None);
        assert_eq!(injection_points[0].risk, Risk::Low);
        assert_eq!(injection_points[0].reason, "");
    }

    #[test]
    fn verdict_keeps_confidence_verbatim() {
        let value = json!({"verdict": "success", "confidence": 90, "evidence": []});
        let normalized = classify(&value, "raw", None);
        assert_eq!(
            normalized.outcome,
            Outcome::AnalysisVerdict {
                explanation: None,
                verdict: Verdict::Success,
                confidence: Some(Confidence::Number(Number::from(90))),
                evidence: Vec::new(),
            }
        );
    }

    #[test]
    fn out_of_range_confidence_is_not_clamped() {
        let value = json!({"verdict": "failure", "confidence": 250});
        let Outcome::AnalysisVerdict { confidence, .. } = classify(&value, "raw", None).outcome
        else {
            panic!("expected verdict");
        };
        assert_eq!(confidence, Some(Confidence::Number(Number::from(250))));

        let value = json!({"verdict": "failure", "confidence": "85%"});
        let Outcome::AnalysisVerdict { confidence, .. } = classify(&value, "raw", None).outcome
        else {
            panic!("expected verdict");
        };
        assert_eq!(confidence, Some(Confidence::Number(Number::from(85))));
    }

    #[test]
    fn non_numeric_confidence_is_passed_through() {
        let value = json!({"verdict": "success", "confidence": "high", "evidence": []});
        let normalized = classify(&value, "raw", None);
        let Outcome::AnalysisVerdict { confidence, .. } = &normalized.outcome else {
            panic!("expected verdict");
        };
        assert_eq!(confidence, &Some(Confidence::Other("high".to_string())));
        assert_eq!(
            serde_json::to_value(&normalized.outcome).unwrap(),
            json!({"type": "analysisVerdict", "verdict": "success", "confidence": "high", "evidence": []})
        );
    }

    #[test]
    fn many_payloads_get_an_advisory_not_an_error() {
        let payloads: Vec<String> = (0..22).map(|i| format!("p{i}")).collect();
        let value = json!({ "payloads": payloads });
        let normalized = classify(&value, "raw", Some("auto-repaired due to formatting issues."));
        assert_eq!(normalized.outcome.kind(), "payloadReport");
        assert_eq!(normalized.warnings.len(), 2);
        assert!(normalized.warnings[1].contains("22 payloads"));
    }

    #[test]
    fn twenty_payloads_are_within_tolerance() {
        let payloads: Vec<String> = (0..20).map(|i| format!("p{i}")).collect();
        let normalized = classify(&json!({ "payloads": payloads }), "raw", None);
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn explanation_only_becomes_a_summary() {
        let value = json!({"explanation": "No obvious issue.", "note": "retry with auth", "score": 3});
        let normalized = classify(&value, "raw", None);
        assert_eq!(
            normalized.outcome,
            Outcome::FreeText {
                message: "No obvious issue.\nnote: retry with auth".to_string(),
                parse_error: None,
                hint: None,
            }
        );
    }

    #[test]
    fn unknown_shapes_fall_back_to_raw_text() {
        let normalized = classify(&json!({"foo": 1}), "the raw reply", None);
        assert_eq!(
            normalized.outcome,
            Outcome::FreeText {
                message: "the raw reply".to_string(),
                parse_error: None,
                hint: None,
            }
        );

        let normalized = classify(&json!([1, 2]), "[1, 2]", None);
        assert_eq!(normalized.outcome.kind(), "freeText");
    }

    #[test]
    fn lenient_element_conversion() {
        let value = json!({"payloads": "single", "injectionPoints": ["id"]});
        let Outcome::CombinedReport {
            injection_points,
            payloads,
            ..
        } = classify(&value, "raw", None).outcome
        else {
            panic!("expected combined report");
        };
        assert_eq!(payloads, vec!["single".to_string()]);
        assert_eq!(injection_points[0].name, "id");
    }
}
