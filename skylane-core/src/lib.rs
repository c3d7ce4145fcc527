pub mod error;
pub mod payment;
pub mod pnr;
pub mod repository;

pub use error::DomainError;
pub use repository::RepoError;
