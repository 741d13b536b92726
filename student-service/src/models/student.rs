use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A student record as stored in the `students` collection.
///
/// `_id` is assigned by the store and never used for addressing; every
/// lookup goes through the unique `student_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub student_id: i64,
    pub name: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub dob: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<f64>,
}

impl Student {
    pub fn new(student_id: i64, name: String, dob: DateTime<Utc>, marks: Option<f64>) -> Self {
        Self {
            id: None,
            student_id,
            name,
            dob,
            marks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::{self, Bson};

    #[test]
    fn new_student_serializes_without_id_or_marks() {
        let dob = Utc.with_ymd_and_hms(2001, 4, 12, 0, 0, 0).unwrap();
        let student = Student::new(7, "Ana".to_string(), dob, None);

        let document = bson::to_document(&student).unwrap();
        assert!(!document.contains_key("_id"));
        assert!(!document.contains_key("marks"));
        assert_eq!(document.get_i64("student_id").unwrap(), 7);
        assert!(matches!(document.get("dob"), Some(Bson::DateTime(_))));
    }

    #[test]
    fn document_without_marks_decodes_as_none() {
        let document = bson::doc! {
            "_id": ObjectId::new(),
            "student_id": 12_i64,
            "name": "Diana",
            "dob": bson::DateTime::from_millis(946_598_400_000),
        };

        let student: Student = bson::from_document(document).unwrap();
        assert_eq!(student.student_id, 12);
        assert!(student.id.is_some());
        assert!(student.marks.is_none());
        assert_eq!(student.dob, Utc.with_ymd_and_hms(1999, 12, 31, 0, 0, 0).unwrap());
    }
}
