pub mod attendance;
pub mod backup;
pub mod calc;
pub mod core;
pub mod courses;
pub mod enrollments;
pub mod grades;
pub mod reports;
pub mod students;
