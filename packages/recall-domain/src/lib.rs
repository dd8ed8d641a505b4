pub mod fingerprint;
pub mod intent;
