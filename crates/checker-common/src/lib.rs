pub mod error;
pub mod fetch;
pub mod ollama;
pub mod redis;

#[cfg(test)]
mod test_http;
