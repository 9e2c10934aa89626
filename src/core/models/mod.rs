pub mod compose;
pub mod decrypt_result;
pub mod key_record;
pub mod message;
