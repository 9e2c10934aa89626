pub mod sequoia_backend;
