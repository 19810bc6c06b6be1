use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub struct AxiomError {
    pub cause: String
}

impl AxiomError {
    pub fn new(cause: impl Into<String>) -> AxiomError {
        AxiomError { cause: cause.into() }
    }
}

impl std::error::Error for AxiomError {}

impl Display for AxiomError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cause: {}", self.cause)
    }
}

impl From<sea_orm::DbErr> for AxiomError {
    fn from(err: sea_orm::DbErr) -> AxiomError {
        AxiomError { cause: format!("{}", err) }
    }
}
