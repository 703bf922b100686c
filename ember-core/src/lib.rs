pub mod behavior;
pub mod clock;
pub mod collaborators;
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Collaborator call failed: {0}")]
    CollaboratorError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
