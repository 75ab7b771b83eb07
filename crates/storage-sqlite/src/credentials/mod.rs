mod model;
mod repository;

pub use model::CredentialDB;
pub use repository::CredentialRepository;
