use crate::core::errors::GeoLensError;

pub fn hash_password(password: &str, cost: u32) -> Result<String, GeoLensError> {
    bcrypt::hash(password, cost).map_err(|e| GeoLensError::InternalServerError(format!("Password hashing error: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, GeoLensError> {
    bcrypt::verify(password, hash)
        .map_err(|e| GeoLensError::InternalServerError(format!("Password verification error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verify() {
        let first = hash_password("secret1", 4).unwrap();
        let second = hash_password("secret1", 4).unwrap();
        assert_ne!(first, second);
        assert!(verify_password("secret1", &first).unwrap());
        assert!(!verify_password("secret2", &first).unwrap());
    }
}
