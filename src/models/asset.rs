//! Asset variants that a user can mark as favourite.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Discriminant for the closed set of asset kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Chart,
    Insight,
    Audience,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Chart => "chart",
            AssetType::Insight => "insight",
            AssetType::Audience => "audience",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chart" => Some(AssetType::Chart),
            "insight" => Some(AssetType::Insight),
            "audience" => Some(AssetType::Audience),
            _ => None,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chart with axis titles and an opaque data payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Chart {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub x_axis_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub y_axis_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// A short textual insight.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Insight {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
}

/// An audience segment described by demographic filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Audience {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub gender: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub birth_country: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub age_groups: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub social_media_hours_daily: String,
    #[serde(deserialize_with = "null_as_default")]
    pub purchases_last_month: i64,
}

/// Explicit `null` decodes like a missing field; validation decides if it is allowed.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A favouritable platform entity.
///
/// Serializes as the bare variant payload; the variant itself travels
/// separately as an [`AssetType`] (request field, table column).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Asset {
    Chart(Chart),
    Insight(Insight),
    Audience(Audience),
}

/// Failure to rebuild an asset from its tag and payload.
#[derive(Debug, thiserror::Error)]
pub enum AssetDecodeError {
    #[error("asset_data is required")]
    MissingData,
    #[error("invalid {asset_type} data: {source}")]
    Malformed {
        asset_type: AssetType,
        #[source]
        source: serde_json::Error,
    },
}

impl Asset {
    pub fn id(&self) -> &str {
        match self {
            Asset::Chart(c) => &c.id,
            Asset::Insight(i) => &i.id,
            Asset::Audience(a) => &a.id,
        }
    }

    pub fn asset_type(&self) -> AssetType {
        match self {
            Asset::Chart(_) => AssetType::Chart,
            Asset::Insight(_) => AssetType::Insight,
            Asset::Audience(_) => AssetType::Audience,
        }
    }

    /// Decode a payload into the variant selected by `asset_type`.
    pub fn from_parts(
        asset_type: AssetType,
        data: serde_json::Value,
    ) -> Result<Self, AssetDecodeError> {
        if data.is_null() {
            return Err(AssetDecodeError::MissingData);
        }

        let malformed = |source| AssetDecodeError::Malformed { asset_type, source };
        let asset = match asset_type {
            AssetType::Chart => Asset::Chart(serde_json::from_value(data).map_err(malformed)?),
            AssetType::Insight => Asset::Insight(serde_json::from_value(data).map_err(malformed)?),
            AssetType::Audience => {
                Asset::Audience(serde_json::from_value(data).map_err(malformed)?)
            }
        };
        Ok(asset)
    }

    /// Same as [`Asset::from_parts`] but reading a stored JSON blob.
    pub fn from_json_str(asset_type: AssetType, raw: &str) -> Result<Self, AssetDecodeError> {
        let value = serde_json::from_str(raw)
            .map_err(|source| AssetDecodeError::Malformed { asset_type, source })?;
        Self::from_parts(asset_type, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_asset_type_round_trips_through_str() {
        for t in [AssetType::Chart, AssetType::Insight, AssetType::Audience] {
            assert_eq!(AssetType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AssetType::parse("Chart"), None);
        assert_eq!(AssetType::parse("video"), None);
    }

    #[test]
    fn test_from_parts_selects_variant_by_tag() {
        let chart = Asset::from_parts(
            AssetType::Chart,
            json!({"id": "c1", "title": "Revenue", "x_axis_title": "Month", "y_axis_title": "USD", "data": {"jan": 10}}),
        )
        .unwrap();
        assert_eq!(chart.asset_type(), AssetType::Chart);
        assert_eq!(chart.id(), "c1");

        let insight = Asset::from_parts(AssetType::Insight, json!({"id": "i1", "text": "t"})).unwrap();
        assert_eq!(insight, Asset::Insight(Insight { id: "i1".into(), text: "t".into() }));
    }

    #[test]
    fn test_missing_fields_decode_to_empty_values() {
        let asset = Asset::from_parts(AssetType::Audience, json!({"id": "a1"})).unwrap();
        match asset {
            Asset::Audience(a) => {
                assert!(a.gender.is_empty());
                assert_eq!(a.social_media_hours_daily, "");
                assert_eq!(a.purchases_last_month, 0);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_null_fields_decode_to_empty_values() {
        let asset = Asset::from_parts(
            AssetType::Audience,
            json!({
                "id": "a1",
                "gender": null,
                "birth_country": null,
                "age_groups": null,
                "social_media_hours_daily": null,
                "purchases_last_month": null
            }),
        )
        .unwrap();
        assert_eq!(
            asset,
            Asset::Audience(Audience { id: "a1".into(), ..Default::default() })
        );
        assert!(crate::models::validation::validate_asset(&asset).is_empty());

        let chart = Asset::from_parts(
            AssetType::Chart,
            json!({"id": "c1", "title": "Revenue", "x_axis_title": "Month", "y_axis_title": "USD", "data": null}),
        )
        .unwrap();
        match chart {
            Asset::Chart(c) => assert!(c.data.is_empty()),
            other => panic!("unexpected variant: {:?}", other),
        }

        // A null required field is left for validation to report
        let insight = Asset::from_parts(AssetType::Insight, json!({"id": "i1", "text": null})).unwrap();
        assert_eq!(
            crate::models::validation::validate_asset(&insight),
            vec!["text is required"]
        );
    }

    #[test]
    fn test_null_data_is_rejected() {
        let err = Asset::from_parts(AssetType::Chart, serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, AssetDecodeError::MissingData));
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let err = Asset::from_parts(AssetType::Insight, json!({"id": 42})).unwrap_err();
        assert!(err.to_string().starts_with("invalid insight data"));
    }

    #[test]
    fn test_serializes_as_bare_payload() {
        let asset = Asset::Insight(Insight { id: "i1".into(), text: "hello".into() });
        let value = serde_json::to_value(&asset).unwrap();
        assert_eq!(value, json!({"id": "i1", "text": "hello"}));

        let back = Asset::from_parts(AssetType::Insight, value).unwrap();
        assert_eq!(back, asset);
    }
}
