pub mod filename;
pub mod fingerprint;
