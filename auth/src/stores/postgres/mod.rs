//! `PostgreSQL` repositories: the system of record.

pub mod account;
pub mod session;

pub use account::PostgresAccountRepository;
pub use session::PostgresSessionRepository;
