use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// One row of the roster.
///
/// Field names on the wire follow the stored blob format (`nis`, `name`, `className`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    /// Registration number (NIS). Used to de-duplicate imports.
    #[serde(rename = "nis")]
    pub external_id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "className", default)]
    pub class_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEvent {
    pub id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Daily presence category.
///
/// Persisted as the Indonesian labels used by the stored data (`Hadir`, `Sakit`,
/// `Izin`, `Alpha`). Anything else read back from storage is kept verbatim as
/// `Unrecognized` so a single odd record cannot make a whole blob unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttendanceStatus {
    Present,
    Sick,
    ExcusedAbsence,
    UnexcusedAbsence,
    Unrecognized(String),
}

pub const RECORDABLE_STATUSES: [AttendanceStatus; 4] = [
    AttendanceStatus::Present,
    AttendanceStatus::Sick,
    AttendanceStatus::ExcusedAbsence,
    AttendanceStatus::UnexcusedAbsence,
];

impl AttendanceStatus {
    pub fn label(&self) -> &str {
        match self {
            AttendanceStatus::Present => "Hadir",
            AttendanceStatus::Sick => "Sakit",
            AttendanceStatus::ExcusedAbsence => "Izin",
            AttendanceStatus::UnexcusedAbsence => "Alpha",
            AttendanceStatus::Unrecognized(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for AttendanceStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Hadir" => AttendanceStatus::Present,
            "Sakit" => AttendanceStatus::Sick,
            "Izin" => AttendanceStatus::ExcusedAbsence,
            "Alpha" => AttendanceStatus::UnexcusedAbsence,
            _ => AttendanceStatus::Unrecognized(raw),
        }
    }
}

impl From<AttendanceStatus> for String {
    fn from(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::Unrecognized(raw) => raw,
            other => other.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attendance status: {0}")]
pub struct StatusParseError(pub String);

/// Strict parse for user input: Indonesian or English names, any case.
impl FromStr for AttendanceStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hadir" | "present" => Ok(AttendanceStatus::Present),
            "sakit" | "sick" => Ok(AttendanceStatus::Sick),
            "izin" | "excused" | "excusedabsence" => Ok(AttendanceStatus::ExcusedAbsence),
            "alpha" | "alpa" | "unexcused" | "unexcusedabsence" => {
                Ok(AttendanceStatus::UnexcusedAbsence)
            }
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub picture: String,
}

pub const GUEST_USER_ID: &str = "guest_local_user";

impl UserProfile {
    pub fn guest() -> Self {
        UserProfile {
            id: GUEST_USER_ID.to_string(),
            name: "Pengguna Offline".to_string(),
            email: "offline@local".to_string(),
            picture: String::new(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id == GUEST_USER_ID
    }

    /// Key under which this identity's data blob is stored.
    pub fn storage_key(&self) -> String {
        format!("simas_data_{}", self.id)
    }
}

/// Everything persisted for one identity. Always written whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default, deserialize_with = "skip_malformed_records")]
    pub records: Vec<AttendanceEvent>,
}

// A stored event that no longer parses (a bad date, a missing field) is dropped
// with a warning instead of making the whole blob unreadable.
fn skip_malformed_records<'de, D>(deserializer: D) -> Result<Vec<AttendanceEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let total = raw.len();
    let records: Vec<AttendanceEvent> = raw
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if records.len() < total {
        warn!(dropped = total - records.len(), "skipped malformed attendance records");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_stored_labels() {
        let s: AttendanceStatus = serde_json::from_str("\"Izin\"").expect("parse");
        assert_eq!(s, AttendanceStatus::ExcusedAbsence);
        assert_eq!(serde_json::to_string(&s).expect("json"), "\"Izin\"");
    }

    #[test]
    fn unknown_stored_status_is_kept_not_rejected() {
        let raw = r#"{"students":[],"records":[
            {"id":"r1","studentId":"s1","date":"2024-03-01","status":"Terlambat"}
        ]}"#;
        let data: UserData = serde_json::from_str(raw).expect("blob loads");
        assert_eq!(
            data.records[0].status,
            AttendanceStatus::Unrecognized("Terlambat".to_string())
        );
        let back = serde_json::to_value(&data).expect("json");
        assert_eq!(back["records"][0]["status"], "Terlambat");
    }

    #[test]
    fn input_parse_accepts_both_languages() {
        assert_eq!("present".parse(), Ok(AttendanceStatus::Present));
        assert_eq!("SAKIT".parse(), Ok(AttendanceStatus::Sick));
        assert_eq!(" izin ".parse(), Ok(AttendanceStatus::ExcusedAbsence));
        assert_eq!("Alpha".parse(), Ok(AttendanceStatus::UnexcusedAbsence));
        assert!("Terlambat".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn malformed_stored_record_is_dropped_not_fatal() {
        let raw = r#"{"students":[{"id":"s1","nis":"001","name":"Budi","className":"10A"}],
            "records":[
                {"id":"r1","studentId":"s1","date":"2024-03-01","status":"Hadir"},
                {"id":"r2","studentId":"s1","date":"01/03/2024","status":"Hadir"},
                {"id":"r3","studentId":"s1","status":"Sakit"}
            ]}"#;
        let data: UserData = serde_json::from_str(raw).expect("blob loads");
        assert_eq!(data.students.len(), 1);
        let ids: Vec<&str> = data.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1"]);
    }

    #[test]
    fn missing_blob_keys_load_empty() {
        let data: UserData = serde_json::from_str("{}").expect("parse");
        assert!(data.students.is_empty());
        assert!(data.records.is_empty());
    }
}
