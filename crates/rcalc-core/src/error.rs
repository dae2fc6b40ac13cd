use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("history error: {0}")]
    History(String),

    #[error("evaluator error: {0}")]
    Evaluator(String),

    #[error("no history entry at row {0}")]
    InvalidRow(usize),

    #[error("config error: {0}")]
    Config(String),

    #[error("post-command error: {0}")]
    Command(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CalcResult<T> = Result<T, CalcError>;
