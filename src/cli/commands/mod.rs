pub mod check;
pub mod decrypt;
pub mod encrypt;
pub mod init;
pub mod keys;
pub mod sign;
