pub mod cipher;
pub mod key_store;
pub mod passphrase_store;
