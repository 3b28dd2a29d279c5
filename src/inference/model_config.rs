/// Decoding parameters for the recipe checkpoint. The defaults mirror the values the
/// model was fine-tuned with and stay fixed across requests.
#[derive(Debug, Copy, Clone)]
pub struct GenerationConfig {
    pub seed: Option<u64>,
    pub temperature: f64,
    pub top_k: usize,
    pub repeat_penalty: f32,
    pub repeat_context_size: usize,
    pub max_new_tokens: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            temperature: 0.4,
            top_k: 30,
            repeat_penalty: 1.3,
            repeat_context_size: 64,
            max_new_tokens: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fine_tuning_run() {
        let config = GenerationConfig::default();
        assert!(config.seed.is_none());
        assert_eq!(config.temperature, 0.4);
        assert_eq!(config.top_k, 30);
        assert_eq!(config.repeat_penalty, 1.3);
        assert_eq!(config.max_new_tokens, 500);
    }
}
