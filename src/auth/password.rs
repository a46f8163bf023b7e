use crate::error::AppError;

/// Hash a plaintext password for storage.
pub fn hash(plaintext: &str, cost: u32) -> Result<String, AppError> {
    Ok(bcrypt::hash(plaintext, cost)?)
}

/// Verify plaintext against a stored hash. A malformed hash counts as a mismatch.
pub fn verify(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}
