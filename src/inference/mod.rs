use anyhow::Result;

pub mod model_config;
pub mod text_pipeline;

/// Seam between the HTTP layer and the loaded checkpoint. Handler tests swap in
/// scripted generators through this trait.
pub trait TextGenerator {
    /// Runs one greedy-to-sampled decode for `prompt` and returns the raw generated
    /// text (prompt echo included) together with the inference time in seconds.
    fn generate(&self, prompt: &str) -> Result<(String, f64)>;

    /// Name of the loaded checkpoint, as reported by the health endpoint.
    fn model_name(&self) -> &str;
}
