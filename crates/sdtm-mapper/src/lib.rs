pub mod context;
pub mod derive;
pub mod error;
pub mod pipeline;

pub use context::{
    MeasureValue, RowContext, SourceIndex, VIRTUAL_ORRES, VIRTUAL_TEST, VIRTUAL_TESTCD,
    is_virtual_column,
};
pub use error::{MapperError, Result};
pub use pipeline::transform;
