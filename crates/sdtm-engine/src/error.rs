use thiserror::Error;

use sdtm_conform::ConformError;
use sdtm_expr::CompileError;
use sdtm_mapper::MapperError;

/// Configuration-class failures of the engine facade.
///
/// Data quality never lands here: callers receive a (records, report)
/// pair, possibly with `submission_ready = false`, for any messy input.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Mapper(#[from] MapperError),
    #[error(transparent)]
    Conform(#[from] ConformError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
