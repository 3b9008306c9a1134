pub mod engine;
pub mod fields;
pub mod spec;

pub use engine::{run_query, QueryPage};
pub use fields::{Field, FieldValue, NumberField, TextField};
pub use spec::{QuerySpec, RangeFilter, SortDirection};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}
