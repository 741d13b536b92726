pub mod students;

pub use students::{
    parse_dob, CreateStudentRequest, ListStudentsParams, ListStudentsResponse, Pagination,
    StudentResponse, UpdateStudentRequest,
};
