use crate::models::Student;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_PAGE_SIZE: u64 = 10;

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_dob(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid dob: {}", raw)))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStudentRequest {
    pub student_id: i64,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub dob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<f64>,
}

impl CreateStudentRequest {
    pub fn to_student(&self) -> Result<Student, AppError> {
        Ok(Student::new(
            self.student_id,
            self.name.clone(),
            parse_dob(&self.dob)?,
            self.marks,
        ))
    }
}

/// Only `name` and `dob` are applied; `marks` and `student_id` in the body
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub dob: Option<String>,
}

impl UpdateStudentRequest {
    /// Fields for the `$set` stage. Empty when the body names neither field.
    pub fn changes(&self) -> Result<Document, AppError> {
        let mut changes = Document::new();

        if let Some(name) = &self.name {
            changes.insert("name", name.as_str());
        }
        if let Some(dob) = &self.dob {
            changes.insert("dob", mongodb::bson::DateTime::from_chrono(parse_dob(dob)?));
        }

        Ok(changes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentResponse {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub student_id: i64,
    pub name: String,
    pub dob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<f64>,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            id: student.id.map(|id| id.to_hex()),
            student_id: student.student_id,
            name: student.name,
            dob: student.dob.to_rfc3339_opts(SecondsFormat::Millis, true),
            marks: student.marks,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListStudentsParams {
    pub page: Option<u64>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u64>,
    pub name: Option<String>,
    pub marks: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size)
    }
}

impl ListStudentsParams {
    pub fn pagination(&self) -> Result<Pagination, AppError> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "page must be at least 1"
            )));
        }
        if page_size == 0 || i64::try_from(page_size).is_err() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "pageSize must be a positive integer"
            )));
        }
        // The driver sends skip as a signed 64-bit integer
        let skip = (page - 1).checked_mul(page_size);
        if skip.and_then(|skip| i64::try_from(skip).ok()).is_none() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "page is out of range"
            )));
        }

        Ok(Pagination { page, page_size })
    }

    /// `name` is a case-insensitive substring match, `marks` an exact match.
    /// Empty values are ignored.
    pub fn filter(&self) -> Result<Document, AppError> {
        let mut filter = doc! {};

        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            filter.insert(
                "name",
                doc! { "$regex": regex::escape(name), "$options": "i" },
            );
        }

        if let Some(marks) = self.marks.as_deref().filter(|marks| !marks.is_empty()) {
            let marks: f64 = marks.trim().parse().map_err(|_| {
                AppError::BadRequest(anyhow::anyhow!("Invalid marks: {}", marks))
            })?;
            filter.insert("marks", doc! { "$eq": marks });
        }

        Ok(filter)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStudentsResponse {
    pub data: Vec<StudentResponse>,
    pub result: usize,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub total_students: u64,
}

impl ListStudentsResponse {
    pub fn new(students: Vec<Student>, pagination: Pagination, total_students: u64) -> Self {
        let data: Vec<StudentResponse> = students.into_iter().map(StudentResponse::from).collect();

        Self {
            result: data.len(),
            data,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages: pagination.total_pages(total_students),
            total_students,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(query: &str) -> ListStudentsParams {
        let uri: axum::http::Uri = format!("/students?{}", query).parse().unwrap();
        axum::extract::Query::<ListStudentsParams>::try_from_uri(&uri)
            .unwrap()
            .0
    }

    #[test]
    fn parse_dob_accepts_calendar_dates() {
        let dob = parse_dob("2001-04-12").unwrap();
        assert_eq!(dob, Utc.with_ymd_and_hms(2001, 4, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_dob_normalizes_offsets_to_utc() {
        let dob = parse_dob("2001-04-12T05:30:00+05:30").unwrap();
        assert_eq!(dob, Utc.with_ymd_and_hms(2001, 4, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_dob_rejects_garbage() {
        let err = parse_dob("last tuesday").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn pagination_defaults_to_first_page_of_ten() {
        let pagination = params("").pagination().unwrap();
        assert_eq!(pagination, Pagination { page: 1, page_size: 10 });
        assert_eq!(pagination.skip(), 0);
    }

    #[test]
    fn pagination_reads_camel_case_page_size() {
        let pagination = params("page=3&pageSize=10").pagination().unwrap();
        assert_eq!(pagination.skip(), 20);
        assert_eq!(pagination.total_pages(25), 3);
    }

    #[test]
    fn total_pages_rounds_up() {
        let pagination = Pagination { page: 1, page_size: 10 };
        assert_eq!(pagination.total_pages(0), 0);
        assert_eq!(pagination.total_pages(10), 1);
        assert_eq!(pagination.total_pages(11), 2);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = params("pageSize=0").pagination().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn zero_page_is_rejected() {
        let err = params("page=0").pagination().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn overflowing_skip_is_rejected() {
        let query = format!("page={}&pageSize={}", u64::MAX, i64::MAX);
        assert!(params(&query).pagination().is_err());
    }

    #[test]
    fn skip_beyond_signed_range_is_rejected() {
        let query = format!("page=3&pageSize={}", i64::MAX);
        let err = params(&query).pagination().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn largest_page_size_on_first_page_is_accepted() {
        let query = format!("page=1&pageSize={}", i64::MAX);
        let pagination = params(&query).pagination().unwrap();
        assert_eq!(pagination.skip(), 0);
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(params("").filter().unwrap().is_empty());
        assert!(params("name=&marks=").filter().unwrap().is_empty());
    }

    #[test]
    fn name_filter_is_case_insensitive_substring() {
        let filter = params("name=anA").filter().unwrap();
        assert_eq!(
            filter,
            doc! { "name": { "$regex": "anA", "$options": "i" } }
        );
    }

    #[test]
    fn name_filter_escapes_regex_metacharacters() {
        let filter = params("name=a.b%2A").filter().unwrap();
        let name = filter.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"a\.b\*");
    }

    #[test]
    fn name_and_marks_are_combined() {
        let filter = params("name=ana&marks=75").filter().unwrap();
        assert_eq!(
            filter,
            doc! {
                "name": { "$regex": "ana", "$options": "i" },
                "marks": { "$eq": 75.0 },
            }
        );
    }

    #[test]
    fn non_numeric_marks_are_rejected() {
        let err = params("marks=high").filter().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn update_changes_only_name_and_dob() {
        let request: UpdateStudentRequest = serde_json::from_value(serde_json::json!({
            "name": "Ana Maria",
            "dob": "2001-04-12",
            "marks": 99,
            "student_id": 42
        }))
        .unwrap();

        let changes = request.changes().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get_str("name").unwrap(), "Ana Maria");
        assert!(changes.get_datetime("dob").is_ok());
        assert!(!changes.contains_key("marks"));
        assert!(!changes.contains_key("student_id"));
    }

    #[test]
    fn update_without_fields_has_no_changes() {
        let changes = UpdateStudentRequest::default().changes().unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn create_request_rejects_empty_name() {
        let request = CreateStudentRequest {
            student_id: 1,
            name: String::new(),
            dob: "2001-04-12".to_string(),
            marks: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn response_formats_dob_with_millis() {
        let student = Student::new(
            3,
            "Ana".to_string(),
            Utc.with_ymd_and_hms(2001, 4, 12, 0, 0, 0).unwrap(),
            Some(75.0),
        );

        let response = StudentResponse::from(student);
        assert_eq!(response.dob, "2001-04-12T00:00:00.000Z");
        assert!(response.id.is_none());
        assert_eq!(response.marks, Some(75.0));
    }

    #[test]
    fn list_response_uses_camel_case_envelope() {
        let pagination = Pagination { page: 3, page_size: 10 };
        let response = ListStudentsResponse::new(Vec::new(), pagination, 25);

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["result"], 0);
        assert_eq!(body["page"], 3);
        assert_eq!(body["pageSize"], 10);
        assert_eq!(body["totalPages"], 3);
        assert_eq!(body["totalStudents"], 25);
        assert!(body["data"].as_array().unwrap().is_empty());
    }
}
