pub mod env_store;
#[cfg(test)]
pub mod memory_store;
pub mod prompt_store;
