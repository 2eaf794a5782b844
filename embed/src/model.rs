use crate::device::select_device;
use crate::pool::masked_mean;
use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use ragcore::Embedder;
use std::collections::HashMap;
use std::path::Path;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Longest input the sentence-transformers checkpoint was trained on.
pub const MAX_SEQ_LEN: usize = 128;
const PAD_ID: u32 = 1;

/// XLM-RoBERTa encoder with mean pooling, as used by the multilingual
/// paraphrase sentence-transformers checkpoints.
pub struct SentenceEmbedder {
    name: String,
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl SentenceEmbedder {
    /// Load `tokenizer.json`, `config.json` and the weights
    /// (`model.safetensors`, else `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path, name: &str) -> Result<Self> {
        let device = select_device();
        tracing::info!(model = name, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: MAX_SEQ_LEN, ..Default::default() }))
            .map_err(|e| anyhow!("failed to configure truncation: {}", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            pad_id: PAD_ID,
            pad_token: "<pad>".to_string(),
            ..Default::default()
        }));

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )
        .with_context(|| format!("parsing {}", config_path.display()))?;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: the weights file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, &device)? }
        } else {
            let weights_path = model_dir.join("pytorch_model.bin");
            let weights = candle_core::pickle::read_all(&weights_path)
                .with_context(|| format!("reading {}", weights_path.display()))?;
            let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, DType::F32, &device)
        };
        let vb = if vb.contains_tensor("roberta.embeddings.word_embeddings.weight") { vb.pp("roberta") } else { vb };
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!(model = name, dim = config.hidden_size, "embedding model ready");

        Ok(Self { name: name.to_string(), model, tokenizer, device, dim: config.hidden_size })
    }
}

impl Embedder for SentenceEmbedder {
    fn model_name(&self) -> &str { &self.name }

    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("tokenization failed: {}", e))?;
        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
        let mut ids = Vec::with_capacity(texts.len() * seq_len);
        let mut mask = Vec::with_capacity(texts.len() * seq_len);
        for enc in &encodings {
            ids.extend_from_slice(enc.get_ids());
            mask.extend_from_slice(enc.get_attention_mask());
        }

        let input_ids = Tensor::from_vec(ids, (texts.len(), seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (texts.len(), seq_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean(&hidden, &attention_mask)?;
        let vectors = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2::<f32>()?;
        Ok(vectors)
    }
}
