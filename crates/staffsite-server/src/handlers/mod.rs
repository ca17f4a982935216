pub mod graphql;
pub mod public;
pub mod revalidate;
pub mod session;
