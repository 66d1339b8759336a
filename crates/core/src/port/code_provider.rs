// Join Code Provider Port

/// Generates opaque join codes. A code is bound 1:1 to a queue at creation
/// and never changes; lookups match only the code column, so raw queue ids
/// cannot be probed through the join path.
pub trait CodeProvider: Send + Sync {
    fn generate_code(&self) -> String;
}

/// Random alphanumeric code provider (production)
pub struct RandomCodeProvider {
    length: usize,
}

impl RandomCodeProvider {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomCodeProvider {
    fn default() -> Self {
        Self { length: 8 }
    }
}

impl CodeProvider for RandomCodeProvider {
    fn generate_code(&self) -> String {
        use rand::distributions::Alphanumeric;
        use rand::Rng;

        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_codes_of_requested_length() {
        let provider = RandomCodeProvider::new(8);
        let code = provider.generate_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn codes_are_unlikely_to_collide() {
        let provider = RandomCodeProvider::default();
        let a = provider.generate_code();
        let b = provider.generate_code();
        assert_ne!(a, b);
    }
}
