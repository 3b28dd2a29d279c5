use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaConfig};
use rand::random;
use tokenizers::Tokenizer;

use crate::inference::model_config::GenerationConfig;
use crate::inference::TextGenerator;

/// Tokens that mark the end of a sequence, probed in order against the tokenizer
/// vocabulary. Which one exists depends on the checkpoint family.
const EOS_TOKENS: [&str; 3] = ["</s>", "<|endoftext|>", "<|end_of_text|>"];

pub struct TextGeneratorPipeline {
    model: Llama,
    config: Config,
    tokenizer: Tokenizer,
    device: Device,
    dtype: DType,
    eos_token: u32,
    generation: GenerationConfig,
    model_name: String,
}

impl TextGeneratorPipeline {
    /// Loads a llama-architecture checkpoint from a local directory holding
    /// `tokenizer.json`, `config.json` and one or more `*.safetensors` shards.
    /// Weights land on the first CUDA device when one is present, otherwise on
    /// the CPU in f32.
    #[tracing::instrument(level = "info")]
    pub fn from_dir(
        model_dir: &Path,
        generation: GenerationConfig,
    ) -> Result<TextGeneratorPipeline> {
        let device = Device::cuda_if_available(0)?;
        let dtype = if matches!(device, Device::Cuda(_)) {
            DType::F16
        } else {
            DType::F32
        };

        let tokenizer_file = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_file)
            .map_err(|err| anyhow!("cannot load tokenizer {}: {err}", tokenizer_file.display()))?;

        let config_file = std::fs::File::open(model_dir.join("config.json"))
            .with_context(|| format!("cannot open config.json in {}", model_dir.display()))?;
        let config: LlamaConfig = serde_json::from_reader(config_file)
            .with_context(|| format!("cannot parse config.json in {}", model_dir.display()))?;
        let config = config.into_config(false);

        let weight_files = safetensor_files(model_dir)?;
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weight_files, dtype, &device)? };
        let model = Llama::load(vb, &config)?;

        let vocab = tokenizer.get_vocab(true);
        let eos_token = match EOS_TOKENS.iter().find_map(|token| vocab.get(*token)) {
            Some(token) => *token,
            None => bail!("tokenizer defines none of {EOS_TOKENS:?}"),
        };

        let model_name = model_dir.file_name().map_or_else(
            || model_dir.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );

        Ok(TextGeneratorPipeline {
            model,
            config,
            tokenizer,
            device,
            dtype,
            eos_token,
            generation,
            model_name,
        })
    }
}

impl TextGenerator for TextGeneratorPipeline {
    #[tracing::instrument(level = "info", skip(self, prompt))]
    fn generate(&self, prompt: &str) -> Result<(String, f64)> {
        let GenerationConfig {
            seed,
            temperature,
            top_k,
            repeat_penalty,
            repeat_context_size,
            max_new_tokens,
        } = self.generation;

        // A fresh cache per call keeps the model shareable across requests.
        let mut cache = Cache::new(true, self.dtype, &self.config, &self.device)?;
        let mut logits_processor = LogitsProcessor::from_sampling(
            seed.unwrap_or_else(random),
            Sampling::TopK {
                k: top_k,
                temperature,
            },
        );

        let mut tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(anyhow::Error::msg)?
            .get_ids()
            .to_vec();
        if tokens.is_empty() {
            bail!("prompt encodes to zero tokens");
        }

        let mut generated = Vec::new();
        let start_gen = std::time::Instant::now();
        for index in 0..max_new_tokens {
            let context_size = if index > 0 { 1 } else { tokens.len() };
            let start_pos = tokens.len().saturating_sub(context_size);
            let input = Tensor::new(&tokens[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.forward(&input, start_pos, &mut cache)?.squeeze(0)?;
            let logits = if (repeat_penalty - 1.).abs() < f32::EPSILON {
                logits
            } else {
                let start_at = tokens.len().saturating_sub(repeat_context_size);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    repeat_penalty,
                    &tokens[start_at..],
                )?
            };

            let next_token = logits_processor.sample(&logits)?;
            tokens.push(next_token);
            if next_token == self.eos_token {
                break;
            }
            generated.push(next_token);
        }

        let continuation = self
            .tokenizer
            .decode(&generated, true)
            .map_err(anyhow::Error::msg)?;
        let mut output = String::from(prompt);
        output.push_str(&continuation);

        Ok((output, start_gen.elapsed().as_secs_f64()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Collects the safetensor shards of `model_dir` in lexical order.
fn safetensor_files(model_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(model_dir)
        .with_context(|| format!("cannot read model directory {}", model_dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "safetensors") {
            files.push(path);
        }
    }
    if files.is_empty() {
        bail!("no *.safetensors files in {}", model_dir.display());
    }
    files.sort();

    Ok(files)
}
