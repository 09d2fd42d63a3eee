//! Favourite records and the request bodies that create or change them.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::asset::{Asset, AssetType};

/// A user's saved reference to an asset.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FavouriteRecord {
    /// Asset id; unique per owner
    pub id: String,
    pub user_id: String,
    pub asset_type: AssetType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: Asset,
}

impl FavouriteRecord {
    /// Build a fresh record stamped with the current time.
    pub fn new(user_id: &str, asset: Asset, description: &str) -> Self {
        let now = now();
        Self {
            id: asset.id().to_string(),
            user_id: user_id.to_string(),
            asset_type: asset.asset_type(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
            data: asset,
        }
    }
}

/// Current time at the microsecond precision the stores keep.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for a modification that must land strictly after `previous`.
pub fn next_update_time(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Request body for adding a favourite.
#[derive(Debug, Clone, Deserialize)]
pub struct AddFavouriteRequest {
    pub asset_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub asset_data: serde_json::Value,
}

/// Request body for replacing a favourite's description.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDescriptionRequest {
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Insight;

    #[test]
    fn test_new_record_takes_identity_from_asset() {
        let asset = Asset::Insight(Insight {
            id: "i1".into(),
            text: "sales doubled".into(),
        });
        let record = FavouriteRecord::new("alice", asset.clone(), "note");

        assert_eq!(record.id, "i1");
        assert_eq!(record.user_id, "alice");
        assert_eq!(record.asset_type, AssetType::Insight);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.data, asset);
    }

    #[test]
    fn test_next_update_time_is_strictly_later() {
        let future = Utc::now() + Duration::seconds(5);
        assert!(next_update_time(future) > future);

        let past = Utc::now() - Duration::seconds(5);
        assert!(next_update_time(past) > past);
    }

    #[test]
    fn test_record_serializes_payload_under_data() {
        let record = FavouriteRecord::new(
            "alice",
            Asset::Insight(Insight {
                id: "i1".into(),
                text: "t".into(),
            }),
            "",
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["asset_type"], "insight");
        assert_eq!(value["data"]["text"], "t");
    }
}
