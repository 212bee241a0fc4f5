//! Domain types: ISUP grades, cases, and case-aligned grade tables.

pub mod grade;
pub mod table;

pub use grade::{Grade, GradeError};
pub use table::{Case, GradeTable, TableError};
