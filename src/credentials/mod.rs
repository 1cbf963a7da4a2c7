pub mod file;
pub mod memory;
pub mod resolver;
pub mod traits;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;
pub use resolver::{
    mask_key, CredentialResolution, CredentialResolver, CredentialSource, ENV_KEY_VARS,
};
pub use traits::{CredentialStore, HostKeySelector, CREDENTIAL_KEY_NAME};
