pub mod obo;
pub mod workspace_connection;

pub use obo::{AccessToken, OnBehalfOfCredential};
pub use workspace_connection::WorkspaceConnectionProvider;
