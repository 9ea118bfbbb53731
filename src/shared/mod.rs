pub mod constants;
pub mod mime;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;
