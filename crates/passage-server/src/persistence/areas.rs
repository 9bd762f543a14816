//! Restricted-area persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use passage_core::models::{
    AreaSchedule, AreaType, GeographicBounds, RestrictedArea, Waypoint,
};

/// Load all active areas from the store.
pub async fn load_active_areas(pool: &SqlitePool) -> Result<Vec<RestrictedArea>> {
    let rows = sqlx::query_as::<_, AreaRow>(
        "SELECT id, name, area_type, bounds, polygon, description, restrictions, \
         schedule_start, schedule_end, schedule_recurring, authority, penalty \
         FROM restricted_areas WHERE active = 1",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RestrictedArea::from).collect())
}

/// Upsert an area into the store.
pub async fn upsert_area(pool: &SqlitePool, area: &RestrictedArea) -> Result<()> {
    let bounds_json = area
        .bounds
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let polygon_json = area
        .polygon
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let restrictions_json = serde_json::to_string(&area.restrictions)?;

    sqlx::query(
        r#"
        INSERT INTO restricted_areas
            (id, name, area_type, bounds, polygon, description, restrictions, active,
             schedule_start, schedule_end, schedule_recurring, authority, penalty, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO UPDATE SET
            name = ?2, area_type = ?3, bounds = ?4, polygon = ?5, description = ?6,
            restrictions = ?7, active = ?8, schedule_start = ?9, schedule_end = ?10,
            schedule_recurring = ?11, authority = ?12, penalty = ?13,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&area.id)
    .bind(&area.name)
    .bind(area.area_type.as_str())
    .bind(&bounds_json)
    .bind(&polygon_json)
    .bind(&area.description)
    .bind(&restrictions_json)
    .bind(area.active)
    .bind(area.schedule.start.to_rfc3339())
    .bind(area.schedule.end.map(|t| t.to_rfc3339()))
    .bind(&area.schedule.recurring)
    .bind(&area.authority)
    .bind(&area.penalty)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete an area by id.
pub async fn delete_area(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM restricted_areas WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct AreaRow {
    id: String,
    name: String,
    area_type: String,
    bounds: Option<String>,
    polygon: Option<String>,
    description: String,
    restrictions: String,
    schedule_start: Option<String>,
    schedule_end: Option<String>,
    schedule_recurring: Option<String>,
    authority: String,
    penalty: Option<String>,
}

impl From<AreaRow> for RestrictedArea {
    /// Row conversion tolerates partial data: an unknown type becomes
    /// `Other`, malformed or missing geometry becomes `None` (the area then
    /// never matches), and a missing schedule start falls back to "now".
    fn from(row: AreaRow) -> Self {
        let area_type: AreaType = row.area_type.parse().unwrap_or(AreaType::Other);
        let bounds = row
            .bounds
            .as_deref()
            .and_then(|s| serde_json::from_str::<GeographicBounds>(s).ok());
        let polygon = row
            .polygon
            .as_deref()
            .and_then(|s| serde_json::from_str::<Vec<Waypoint>>(s).ok());
        let restrictions: Vec<String> =
            serde_json::from_str(&row.restrictions).unwrap_or_default();

        RestrictedArea {
            id: row.id,
            name: row.name,
            area_type,
            bounds,
            polygon,
            description: row.description,
            restrictions,
            active: true,
            schedule: AreaSchedule {
                start: row
                    .schedule_start
                    .as_deref()
                    .and_then(parse_utc)
                    .unwrap_or_else(Utc::now),
                end: row.schedule_end.as_deref().and_then(parse_utc),
                recurring: row.schedule_recurring,
            },
            authority: row.authority,
            penalty: row.penalty,
        }
    }
}

fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use passage_core::default_areas;

    #[tokio::test]
    async fn upsert_load_delete_round_trip() {
        let db = init_database(":memory:", 1).await.unwrap();
        let area = default_areas()
            .into_iter()
            .find(|a| a.id == "nms-stellwagen-bank")
            .unwrap();

        upsert_area(db.pool(), &area).await.unwrap();
        let loaded = load_active_areas(db.pool()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, area.id);
        assert_eq!(loaded[0].area_type, AreaType::MarineSanctuary);
        assert_eq!(loaded[0].bounds, area.bounds);
        assert_eq!(loaded[0].restrictions, area.restrictions);

        // Upsert replaces rather than duplicating
        upsert_area(db.pool(), &area).await.unwrap();
        assert_eq!(load_active_areas(db.pool()).await.unwrap().len(), 1);

        assert!(delete_area(db.pool(), &area.id).await.unwrap());
        assert!(!delete_area(db.pool(), &area.id).await.unwrap());
    }

    #[tokio::test]
    async fn tolerates_malformed_optional_fields() {
        let db = init_database(":memory:", 1).await.unwrap();
        sqlx::query(
            "INSERT INTO restricted_areas (id, name, area_type, bounds, restrictions, active, authority) \
             VALUES ('ragged', 'Ragged Row', 'mystery_zone', 'not-json', 'also-not-json', 1, 'nobody')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let loaded = load_active_areas(db.pool()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].area_type, AreaType::Other);
        assert!(loaded[0].bounds.is_none());
        assert!(loaded[0].polygon.is_none());
        assert!(loaded[0].restrictions.is_empty());
    }
}
