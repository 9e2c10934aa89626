pub mod classifier;
pub mod cleartext_verifier;
pub mod compose_service;
pub mod decrypt_service;
pub mod inflight;
pub mod key_service;
pub mod recipient_resolver;
