//! Lenient decoding of backend collections.
//!
//! A payload whose top-level shape is wrong is a [`GatewayError::Decode`].
//! Inside a well-shaped collection, an element that cannot be decoded is
//! logged and skipped so one bad record never blanks a whole layer.

use serde::de::DeserializeOwned;

use crate::GatewayError;

/// Decodes a JSON array into `T`s, skipping elements that fail.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if `value` is not an array.
pub fn decode_list<T: DeserializeOwned>(
    url: &str,
    value: serde_json::Value,
) -> Result<Vec<T>, GatewayError> {
    let serde_json::Value::Array(items) = value else {
        return Err(GatewayError::Decode {
            url: url.to_string(),
            message: format!("expected an array, got {}", kind_of(&value)),
        });
    };

    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Skipping malformed element {i} from {url}: {e}");
                None
            }
        })
        .collect();

    if decoded.len() < total {
        log::warn!(
            "Decoded {}/{total} elements from {url}",
            decoded.len()
        );
    }

    Ok(decoded)
}

/// Decodes a `{"<field>": [...]}` envelope.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if `value` is not an object holding
/// an array under `field`.
pub fn decode_wrapped_list<T: DeserializeOwned>(
    url: &str,
    field: &str,
    mut value: serde_json::Value,
) -> Result<Vec<T>, GatewayError> {
    let Some(inner) = value.get_mut(field).map(serde_json::Value::take) else {
        return Err(GatewayError::Decode {
            url: url.to_string(),
            message: format!("missing \"{field}\" in {}", kind_of(&value)),
        });
    };
    decode_list(url, inner)
}

/// Decodes a single JSON object.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if `value` does not decode into `T`.
pub fn decode_record<T: DeserializeOwned>(
    url: &str,
    value: serde_json::Value,
) -> Result<T, GatewayError> {
    if !value.is_object() {
        return Err(GatewayError::Decode {
            url: url.to_string(),
            message: format!("expected an object, got {}", kind_of(&value)),
        });
    }
    serde_json::from_value(value).map_err(|e| GatewayError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

const fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use amanai_incident_models::{DashboardStats, HeatPoint, Incident, StatValue};
    use serde_json::json;

    use super::*;

    #[test]
    fn skips_malformed_elements() {
        let incidents: Vec<Incident> = decode_list(
            "u",
            json!([
                {"id": 1, "lat": 24.7, "lng": 46.7},
                {"id": "not-a-number"},
                {"id": 3}
            ]),
        )
        .unwrap();
        let ids: Vec<_> = incidents.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![Some(1), Some(3)]);
    }

    #[test]
    fn rejects_non_array() {
        let err = decode_list::<Incident>("u", json!({"detail": "oops"})).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn unwraps_heatmap_envelope() {
        let points: Vec<HeatPoint> = decode_wrapped_list(
            "u",
            "points",
            json!({"points": [{"lat": 24.7, "lng": 46.7, "weight": 3}]}),
        )
        .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].severity(), 3);
    }

    #[test]
    fn missing_envelope_field_is_decode_error() {
        let err = decode_wrapped_list::<HeatPoint>("u", "points", json!([])).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn record_requires_object() {
        let stats: DashboardStats =
            decode_record("u", json!({"total": 5, "high": 2})).unwrap();
        assert_eq!(stats.total, Some(StatValue::Int(5)));
        assert!(decode_record::<DashboardStats>("u", json!([1, 2])).is_err());
    }
}
