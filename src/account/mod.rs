pub mod model;
mod store;

pub use store::{determine_initial_role, AcceptAnyPassword, CredentialVerifier, UserStore};
