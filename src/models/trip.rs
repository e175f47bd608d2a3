use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single vehicle-use episode from check-out to check-in.
///
/// `ended_at == None` means the trip is OPEN and the vehicle is considered
/// in use. For every persisted closed trip `end_odometer` is present and
/// greater than or equal to `start_odometer`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub vehicle_id: String,
    pub driver_id: String,
    pub supervisor_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub start_odometer: f64,
    pub end_odometer: Option<f64>,
    /// Opaque photo-proof URLs owned by the evidence subsystem; stored and
    /// returned verbatim, never fetched.
    pub start_evidence_url: Option<String>,
    pub end_evidence_url: Option<String>,
    /// Audit trail: override confirmations, manual closes and corrections
    /// append lines here.
    pub notes: Option<String>,
}

impl Trip {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Fields supplied when opening a trip; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub vehicle_id: String,
    pub driver_id: String,
    pub supervisor_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub start_odometer: f64,
    pub start_evidence_url: Option<String>,
    pub notes: Option<String>,
}

impl NewTrip {
    pub fn into_trip(self) -> Trip {
        Trip {
            id: Uuid::new_v4().to_string(),
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            supervisor_id: self.supervisor_id,
            started_at: self.started_at,
            ended_at: None,
            start_odometer: self.start_odometer,
            end_odometer: None,
            start_evidence_url: self.start_evidence_url,
            end_evidence_url: None,
            notes: self.notes,
        }
    }
}

/// Partial update of a trip. Plain `Option` fields are "set or leave alone";
/// double-option fields distinguish "leave alone" (key omitted) from
/// "clear" (key sent as `null`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_with::rust::double_option"
    )]
    pub supervisor_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_with::rust::double_option"
    )]
    pub ended_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_odometer: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_with::rust::double_option"
    )]
    pub end_odometer: Option<Option<f64>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_with::rust::double_option"
    )]
    pub start_evidence_url: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_with::rust::double_option"
    )]
    pub end_evidence_url: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_with::rust::double_option"
    )]
    pub notes: Option<Option<String>>,
}

impl TripPatch {
    /// Apply this patch to a trip in place. Shared by both store adapters
    /// and by the lifecycle's pre-write validation.
    pub fn apply(&self, trip: &mut Trip) {
        if let Some(vehicle_id) = &self.vehicle_id {
            trip.vehicle_id = vehicle_id.clone();
        }
        if let Some(driver_id) = &self.driver_id {
            trip.driver_id = driver_id.clone();
        }
        if let Some(supervisor_id) = &self.supervisor_id {
            trip.supervisor_id = supervisor_id.clone();
        }
        if let Some(started_at) = self.started_at {
            trip.started_at = started_at;
        }
        if let Some(ended_at) = self.ended_at {
            trip.ended_at = ended_at;
        }
        if let Some(start_odometer) = self.start_odometer {
            trip.start_odometer = start_odometer;
        }
        if let Some(end_odometer) = self.end_odometer {
            trip.end_odometer = end_odometer;
        }
        if let Some(url) = &self.start_evidence_url {
            trip.start_evidence_url = url.clone();
        }
        if let Some(url) = &self.end_evidence_url {
            trip.end_evidence_url = url.clone();
        }
        if let Some(notes) = &self.notes {
            trip.notes = notes.clone();
        }
    }
}

/// History query parameters; all optional, combined with AND.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripFilter {
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl TripFilter {
    pub fn for_vehicle(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: Some(vehicle_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, trip: &Trip) -> bool {
        if let Some(vehicle_id) = &self.vehicle_id {
            if &trip.vehicle_id != vehicle_id {
                return false;
            }
        }
        if let Some(driver_id) = &self.driver_id {
            if &trip.driver_id != driver_id {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if trip.started_at < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if trip.started_at > to {
                return false;
            }
        }
        true
    }
}

/// Append an audit line to an existing notes blob.
pub fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing {
        Some(notes) if !notes.trim().is_empty() => format!("{notes}\n{line}"),
        _ => line.to_string(),
    }
}
