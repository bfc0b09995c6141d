pub mod chain;
pub mod protocol;
pub mod session;
pub mod setup;
pub mod tools;

#[cfg(test)]
mod tests;
