pub mod postgres;

pub use postgres::PgVectorStore;
