use super::client::ArcGisClient;
use crate::types::{CachedChangeHints, ChangeCheckInfo, ChangeCheckMethod, DatasetRef};
use chrono::{DateTime, TimeZone, Utc};

/// Compares the layer's `editingInfo.lastEditDate` against the previously
/// recorded value. Never errors: a metadata fetch failure or a server that
/// doesn't surface an edit date both yield an inconclusive result rather
/// than propagating, since a change check failing should not block a crawl.
pub async fn check_changed(
    client: &ArcGisClient,
    dataset: &DatasetRef,
    cached: &CachedChangeHints,
) -> ChangeCheckInfo {
    let metadata = match client.layer_metadata(&dataset.access_url).await {
        Ok(metadata) => metadata,
        Err(e) => {
            return ChangeCheckInfo {
                method: ChangeCheckMethod::ProviderEditDate,
                changed: false,
                conclusive: false,
                details: serde_json::json!({"error": e.to_string()}),
            }
        }
    };

    let last_edit_millis = metadata
        .get("editingInfo")
        .and_then(|info| info.get("lastEditDate"))
        .and_then(serde_json::Value::as_i64);

    let Some(last_edit_millis) = last_edit_millis else {
        return ChangeCheckInfo {
            method: ChangeCheckMethod::ProviderEditDate,
            changed: false,
            conclusive: false,
            details: serde_json::json!({"reason": "server does not expose editingInfo.lastEditDate"}),
        };
    };

    let Some(upstream_edit) = millis_to_datetime(last_edit_millis) else {
        return ChangeCheckInfo {
            method: ChangeCheckMethod::ProviderEditDate,
            changed: false,
            conclusive: false,
            details: serde_json::json!({"reason": "unparseable lastEditDate", "raw": last_edit_millis}),
        };
    };

    let changed = match cached.last_known_upstream_update {
        Some(known) => upstream_edit > known,
        None => true,
    };

    ChangeCheckInfo {
        method: ChangeCheckMethod::ProviderEditDate,
        changed,
        conclusive: true,
        details: serde_json::json!({"last_edit_date": upstream_edit.to_rfc3339()}),
    }
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_millis_to_datetime() {
        let dt = millis_to_datetime(1_700_000_000_000).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn rejects_out_of_range_millis() {
        assert!(millis_to_datetime(i64::MAX).is_none());
    }
}
