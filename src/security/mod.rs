pub mod key_files;
pub mod signing;

pub use key_files::{KeyPaths, key_id_from_path, load_signer, load_verifier, write_keypair};
pub use signing::{KeyPair, RunSigner, RunVerifier, generate_keypair, sign, verify};
