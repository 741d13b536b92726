pub mod health;
pub mod students;

pub use health::{health_check, metrics, readiness_check};
pub use students::{create_student, delete_student, get_student, list_students, update_student};
