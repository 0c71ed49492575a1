//! Read-only queries over the bulk-imported tables
//!
//! Sightings join to checklist events on `SAMPLING_EVENT_IDENTIFIER`; a
//! sighting whose event is missing simply drops out of every join.

use birdwatch_common::db::Species;
use birdwatch_common::observation::positive_count_sql;
use birdwatch_common::{parse_intensity, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Closed latitude/longitude box
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Reject NaN and infinite bounds; an inverted box is allowed and matches nothing
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("north", self.north),
            ("south", self.south),
            ("east", self.east),
            ("west", self.west),
        ];
        for (name, value) in bounds {
            if !value.is_finite() {
                return Err(Error::InvalidInput(format!("{} bound must be a finite number", name)));
            }
        }
        Ok(())
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

/// One sighting placed on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSighting {
    pub species: String,
    pub lat: f64,
    pub lon: f64,
    pub intensity: i64,
}

/// Ordering option for species search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Latest observation first
    Recent,
    /// Earliest observation first
    Old,
}

impl SortOrder {
    /// `"recent"` / `"old"`; anything else means unordered
    pub fn from_option(option: Option<&str>) -> Option<Self> {
        match option {
            Some("recent") => Some(SortOrder::Recent),
            Some("old") => Some(SortOrder::Old),
            _ => None,
        }
    }
}

/// Latitude/longitude pair of a checklist event
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    #[serde(rename = "LATITUDE")]
    pub latitude: f64,
    #[serde(rename = "LONGITUDE")]
    pub longitude: f64,
}

/// Dates on which a species was observed, plus where it was seen last
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservationDates {
    pub observation_dates: Vec<String>,
    pub most_recent_sighting: Option<Coordinates>,
}

/// All sightings whose event lies inside the box, with the event's coordinates
pub async fn sightings_in_box(pool: &SqlitePool, bbox: &BoundingBox) -> Result<Vec<MapSighting>> {
    bbox.validate()?;

    let rows: Vec<(String, f64, f64, String)> = sqlx::query_as(
        "SELECT s.COMMON_NAME, c.LATITUDE, c.LONGITUDE, s.OBSERVATION_COUNT
         FROM sightings s
         JOIN checklist c ON c.SAMPLING_EVENT_IDENTIFIER = s.SAMPLING_EVENT_IDENTIFIER
         WHERE c.LATITUDE <= ? AND c.LATITUDE >= ?
           AND c.LONGITUDE <= ? AND c.LONGITUDE >= ?
         ORDER BY s.id",
    )
    .bind(bbox.north)
    .bind(bbox.south)
    .bind(bbox.east)
    .bind(bbox.west)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(species, lat, lon, count)| {
            debug_assert!(bbox.contains(lat, lon), "{} at ({}, {}) outside box", species, lat, lon);
            MapSighting {
                species,
                lat,
                lon,
                intensity: parse_intensity(&count),
            }
        })
        .collect())
}

/// Distinct species names with at least one positive count
///
/// `needle` restricts to names containing it (case-sensitive, no wildcards).
/// Without an order names come back alphabetically; with one, each name is
/// ranked by its latest (`Recent`) or earliest (`Old`) matching event date.
pub async fn positive_species(
    pool: &SqlitePool,
    needle: Option<&str>,
    order: Option<SortOrder>,
) -> Result<Vec<String>> {
    let needle = needle.filter(|n| !n.is_empty());

    let mut conditions = vec![positive_count_sql("s.OBSERVATION_COUNT")];
    if needle.is_some() {
        conditions.push("instr(s.COMMON_NAME, ?) > 0".to_string());
    }
    let where_clause = conditions.join(" AND ");

    let Some(order) = order else {
        let sql = format!(
            "SELECT DISTINCT s.COMMON_NAME FROM sightings s WHERE {} ORDER BY s.COMMON_NAME",
            where_clause
        );
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        if let Some(n) = needle {
            query = query.bind(n);
        }
        return Ok(query.fetch_all(pool).await?);
    };

    let (aggregate, direction) = match order {
        SortOrder::Recent => ("MAX", "DESC"),
        SortOrder::Old => ("MIN", "ASC"),
    };
    let sql = format!(
        "SELECT s.COMMON_NAME, {agg}(c.OBSERVATION_DATE) AS seen
         FROM sightings s
         JOIN checklist c ON c.SAMPLING_EVENT_IDENTIFIER = s.SAMPLING_EVENT_IDENTIFIER
         WHERE {cond}
         GROUP BY s.COMMON_NAME
         ORDER BY seen {dir}, s.COMMON_NAME",
        agg = aggregate,
        cond = where_clause,
        dir = direction
    );
    let mut query = sqlx::query_as::<_, (String, String)>(&sql);
    if let Some(n) = needle {
        query = query.bind(n);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(|(name, _)| name).collect())
}

/// Observation dates for one species, optionally pinned to a single date
pub async fn observation_dates(
    pool: &SqlitePool,
    common_name: &str,
    date: Option<&str>,
) -> Result<ObservationDates> {
    if common_name.is_empty() {
        return Ok(ObservationDates::default());
    }
    let date = date.filter(|d| !d.is_empty());

    let date_clause = if date.is_some() {
        " AND c.OBSERVATION_DATE = ?"
    } else {
        ""
    };

    let dates_sql = format!(
        "SELECT DISTINCT c.OBSERVATION_DATE
         FROM sightings s
         JOIN checklist c ON c.SAMPLING_EVENT_IDENTIFIER = s.SAMPLING_EVENT_IDENTIFIER
         WHERE s.COMMON_NAME = ?{}
         ORDER BY c.OBSERVATION_DATE",
        date_clause
    );
    let mut dates_query = sqlx::query_scalar::<_, String>(&dates_sql).bind(common_name);
    if let Some(d) = date {
        dates_query = dates_query.bind(d);
    }
    let observation_dates = dates_query.fetch_all(pool).await?;

    let latest_sql = format!(
        "SELECT c.LATITUDE, c.LONGITUDE
         FROM sightings s
         JOIN checklist c ON c.SAMPLING_EVENT_IDENTIFIER = s.SAMPLING_EVENT_IDENTIFIER
         WHERE s.COMMON_NAME = ?{}
         ORDER BY c.OBSERVATION_DATE DESC, c.id DESC
         LIMIT 1",
        date_clause
    );
    let mut latest_query = sqlx::query_as::<_, (f64, f64)>(&latest_sql).bind(common_name);
    if let Some(d) = date {
        latest_query = latest_query.bind(d);
    }
    let most_recent_sighting = latest_query
        .fetch_optional(pool)
        .await?
        .map(|(latitude, longitude)| Coordinates { latitude, longitude });

    Ok(ObservationDates {
        observation_dates,
        most_recent_sighting,
    })
}

/// Every species, alphabetically
pub async fn list_species(pool: &SqlitePool) -> Result<Vec<Species>> {
    let species = sqlx::query_as::<_, Species>("SELECT id, name FROM species ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(species)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_from_option() {
        assert_eq!(SortOrder::from_option(Some("recent")), Some(SortOrder::Recent));
        assert_eq!(SortOrder::from_option(Some("old")), Some(SortOrder::Old));
        assert_eq!(SortOrder::from_option(Some("newest")), None);
        assert_eq!(SortOrder::from_option(None), None);
    }

    #[test]
    fn test_bbox_contains_is_closed() {
        let bbox = BoundingBox {
            north: 20.0,
            south: 0.0,
            east: 20.0,
            west: 0.0,
        };
        assert!(bbox.contains(0.0, 0.0));
        assert!(bbox.contains(20.0, 20.0));
        assert!(bbox.contains(10.0, 10.0));
        assert!(!bbox.contains(20.5, 10.0));
        assert!(!bbox.contains(10.0, -0.1));
    }

    #[test]
    fn test_bbox_rejects_non_finite() {
        let bbox = BoundingBox {
            north: f64::NAN,
            south: 0.0,
            east: 1.0,
            west: 0.0,
        };
        assert!(matches!(bbox.validate(), Err(Error::InvalidInput(_))));
    }
}
