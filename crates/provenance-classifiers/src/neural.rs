//! Candle-backed neural sequence classifiers (BERT, RoBERTa)
//!
//! A model directory holds `config.json`, `model.safetensors` and a
//! tokenizer: `tokenizer.json`, a WordPiece `vocab.txt`, or byte-level BPE
//! `vocab.json` + `merges.txt`. Both heads emit two logits; index 1 is HUMAN.

use crate::classifier::TextClassifier;
use crate::config::DeviceSpec;
use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as RobertaConfig, XLMRobertaForSequenceClassification,
};
use provenance_core::{ClassificationResult, Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};

/// Both neural heads are binary: `[AI, HUMAN]`
const NUM_LABELS: usize = 2;

fn candle_err(context: &'static str) -> impl FnOnce(candle_core::Error) -> Error {
    move |e| Error::inference(format!("{}: {}", context, e))
}

/// Select the candle device for the configured spec
pub fn select_device(spec: DeviceSpec) -> Result<Device> {
    match spec {
        DeviceSpec::Cpu => Ok(Device::Cpu),
        DeviceSpec::Cuda => Device::new_cuda(0)
            .map_err(|e| Error::config(format!("Failed to initialize CUDA: {}", e))),
        DeviceSpec::Metal => Device::new_metal(0)
            .map_err(|e| Error::config(format!("Failed to initialize Metal: {}", e))),
    }
}

/// Fetch a checkpoint from the HuggingFace Hub into the local cache.
///
/// Blocking; returns the cache directory holding the downloaded files.
pub fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    tracing::info!(repo, revision, "Downloading model from HuggingFace");

    let api = hf_hub::api::sync::Api::new()
        .map_err(|e| Error::config(format!("Failed to initialize HuggingFace API: {}", e)))?;
    let repo_obj = api.repo(hf_hub::Repo::with_revision(
        repo.to_string(),
        hf_hub::RepoType::Model,
        revision.to_string(),
    ));

    let config_path = repo_obj
        .get("config.json")
        .map_err(|e| Error::config(format!("Failed to download config.json from {}: {}", repo, e)))?;
    repo_obj.get("model.safetensors").map_err(|e| {
        Error::config(format!(
            "Failed to download model.safetensors from {}: {}",
            repo, e
        ))
    })?;

    let has_tokenizer = repo_obj.get("tokenizer.json").is_ok()
        || repo_obj.get("vocab.txt").is_ok()
        || (repo_obj.get("vocab.json").is_ok() && repo_obj.get("merges.txt").is_ok());
    if !has_tokenizer {
        return Err(Error::config(format!(
            "No tokenizer found in {} (tried tokenizer.json, vocab.txt, vocab.json + merges.txt)",
            repo
        )));
    }
    // Optional; carries do_lower_case for WordPiece vocabularies
    let _ = repo_obj.get("tokenizer_config.json");

    let model_dir = config_path
        .parent()
        .ok_or_else(|| Error::config("Invalid HuggingFace cache path"))?;

    tracing::info!(path = %model_dir.display(), "Model available");
    Ok(model_dir.to_path_buf())
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::config(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::config(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_var_builder(model_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_path.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::config(format!(
            "model.safetensors not found in {}",
            model_path.display()
        )));
    }

    // SAFETY: the weights file is memory-mapped read-only and not modified while loaded.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::config(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

/// Load the tokenizer with truncation to `max_length` tokens
fn load_tokenizer(model_path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = read_tokenizer(model_path)?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::config(format!("Failed to configure truncation: {}", e)))?;
    Ok(tokenizer)
}

fn read_tokenizer(model_path: &Path) -> Result<Tokenizer> {
    let tokenizer_json_path = model_path.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(|e| Error::config(format!("Failed to load tokenizer.json: {}", e)));
    }

    let vocab_path = model_path.join("vocab.txt");
    if vocab_path.exists() {
        return wordpiece_tokenizer(model_path, &vocab_path);
    }

    let bpe_vocab_path = model_path.join("vocab.json");
    let merges_path = model_path.join("merges.txt");
    if bpe_vocab_path.exists() && merges_path.exists() {
        return byte_level_bpe_tokenizer(&bpe_vocab_path, &merges_path);
    }

    Err(Error::config(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.txt, vocab.json + merges.txt)",
        model_path.display()
    )))
}

/// Id of a special token, which must be present in the vocabulary
fn special_token(tokenizer: &Tokenizer, token: &str) -> Result<(String, u32)> {
    tokenizer
        .token_to_id(token)
        .map(|id| (token.to_string(), id))
        .ok_or_else(|| Error::config(format!("Special token {} missing from vocabulary", token)))
}

/// `do_lower_case` from `tokenizer_config.json`; uncased when absent
fn lowercase_setting(model_path: &Path) -> Result<bool> {
    let config_path = model_path.join("tokenizer_config.json");
    if !config_path.exists() {
        return Ok(true);
    }
    let config: serde_json::Value = parse_json_config(&config_path)?;
    Ok(config
        .get("do_lower_case")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true))
}

/// BERT WordPiece tokenizer from `vocab.txt`
fn wordpiece_tokenizer(model_path: &Path, vocab_path: &Path) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::normalizers::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::processors::bert::BertProcessing;

    let lowercase = lowercase_setting(model_path)?;
    tracing::debug!(lowercase, "Building WordPiece tokenizer from vocab.txt");

    let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| Error::config(format!("Failed to build WordPiece model: {}", e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    let sep = special_token(&tokenizer, "[SEP]")?;
    let cls = special_token(&tokenizer, "[CLS]")?;

    tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
    tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));
    Ok(tokenizer)
}

/// RoBERTa byte-level BPE tokenizer from `vocab.json` and `merges.txt`
fn byte_level_bpe_tokenizer(vocab_path: &Path, merges_path: &Path) -> Result<Tokenizer> {
    use tokenizers::models::bpe::BPE;
    use tokenizers::pre_tokenizers::byte_level::ByteLevel;
    use tokenizers::processors::roberta::RobertaProcessing;

    tracing::debug!("Building byte-level BPE tokenizer from vocab.json and merges.txt");

    let bpe = BPE::from_file(
        vocab_path.to_string_lossy().as_ref(),
        merges_path.to_string_lossy().as_ref(),
    )
    .build()
    .map_err(|e| Error::config(format!("Failed to build BPE model: {}", e)))?;

    let mut tokenizer = Tokenizer::new(bpe);
    let sep = special_token(&tokenizer, "</s>")?;
    let cls = special_token(&tokenizer, "<s>")?;

    tokenizer.with_pre_tokenizer(Some(ByteLevel::new(false, true, true)));
    tokenizer.with_decoder(Some(ByteLevel::default()));
    tokenizer.with_post_processor(Some(RobertaProcessing::new(sep, cls)));
    Ok(tokenizer)
}

/// Try each weight prefix in turn; the first that loads wins
fn load_with_prefixes<T>(
    vb: &VarBuilder,
    prefixes: &[&str],
    what: &str,
    load: impl Fn(VarBuilder) -> candle_core::Result<T>,
) -> Result<T> {
    let mut errors = Vec::new();

    for prefix in prefixes {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(*prefix)
        };
        let shown = if prefix.is_empty() { "<root>" } else { prefix };

        match load(vb_prefix) {
            Ok(loaded) => {
                tracing::debug!(prefix = shown, "Loaded {}", what);
                return Ok(loaded);
            }
            Err(e) => errors.push(format!("{}: {}", shown, e)),
        }
    }

    Err(Error::config(format!(
        "Failed to load {} with tried prefixes [{}]",
        what,
        errors.join(" | ")
    )))
}

/// Encode `text` into `(input_ids, token_type_ids, attention_mask)`, batch of one
fn encode(tokenizer: &Tokenizer, text: &str, device: &Device) -> Result<(Tensor, Tensor, Tensor)> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| Error::inference(format!("Tokenization failed: {}", e)))?;

    let row = |values: &[u32], what: &'static str| -> Result<Tensor> {
        Tensor::new(values, device)
            .map_err(candle_err(what))?
            .unsqueeze(0)
            .map_err(candle_err(what))
    };

    Ok((
        row(encoding.get_ids(), "input ids")?,
        row(encoding.get_type_ids(), "token type ids")?,
        row(encoding.get_attention_mask(), "attention mask")?,
    ))
}

/// Softmax over the two logits of a batch of one
fn to_result(logits: &Tensor) -> Result<ClassificationResult> {
    let probs: Vec<f32> = candle_nn::ops::softmax(logits, D::Minus1)
        .map_err(candle_err("softmax"))?
        .squeeze(0)
        .map_err(candle_err("squeeze"))?
        .to_vec1()
        .map_err(candle_err("logits to vec"))?;

    match probs.as_slice() {
        [p_ai, p_human] => Ok(ClassificationResult::from_probabilities(
            f64::from(*p_ai),
            f64::from(*p_human),
        )),
        other => Err(Error::inference(format!(
            "expected {} logits, got {}",
            NUM_LABELS,
            other.len()
        ))),
    }
}

/// BERT backbone, pooler and linear head
pub struct BertSequenceClassifier {
    name: String,
    tokenizer: Tokenizer,
    model: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
    device: Device,
}

impl BertSequenceClassifier {
    pub fn load(
        name: impl Into<String>,
        model_path: &Path,
        device: &Device,
        max_length: usize,
    ) -> Result<Self> {
        let name = name.into();
        let tokenizer = load_tokenizer(model_path, max_length)?;
        let config: BertConfig = parse_json_config(&model_path.join("config.json"))?;
        let vb = load_var_builder(model_path, device)?;

        let model = load_with_prefixes(&vb, &["bert", "roberta", ""], "BERT backbone", |vb| {
            BertModel::load(vb, &config)
        })?;

        let hidden = config.hidden_size;
        let pooler = match load_with_prefixes(
            &vb,
            &["bert.pooler.dense", "pooler.dense"],
            "pooler",
            |vb| candle_nn::linear(hidden, hidden, vb),
        ) {
            Ok(pooler) => Some(pooler),
            Err(e) => {
                tracing::warn!(model = %name, "No pooler weights, using raw CLS state: {}", e);
                None
            }
        };

        let classifier = load_with_prefixes(&vb, &["classifier"], "classification head", |vb| {
            candle_nn::linear(hidden, NUM_LABELS, vb)
        })?;

        tracing::info!(model = %name, path = %model_path.display(), max_length, "Loaded BERT sequence classifier");

        Ok(Self {
            name,
            tokenizer,
            model,
            pooler,
            classifier,
            device: device.clone(),
        })
    }
}

#[async_trait]
impl TextClassifier for BertSequenceClassifier {
    async fn predict(&self, text: &str) -> Result<ClassificationResult> {
        let (input_ids, token_type_ids, attention_mask) =
            encode(&self.tokenizer, text, &self.device)?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(candle_err("forward pass"))?;

        let mut cls = hidden_states
            .i((.., 0, ..))
            .map_err(candle_err("CLS token"))?;
        if let Some(pooler) = &self.pooler {
            cls = pooler
                .forward(&cls)
                .and_then(|pooled| pooled.tanh())
                .map_err(candle_err("pooler"))?;
        }

        let logits = self
            .classifier
            .forward(&cls)
            .map_err(candle_err("classification head"))?;

        to_result(&logits)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// RoBERTa backbone with its dense + projection head
pub struct RobertaSequenceClassifier {
    name: String,
    tokenizer: Tokenizer,
    model: XLMRobertaForSequenceClassification,
    device: Device,
}

impl RobertaSequenceClassifier {
    pub fn load(
        name: impl Into<String>,
        model_path: &Path,
        device: &Device,
        max_length: usize,
    ) -> Result<Self> {
        let name = name.into();
        let tokenizer = load_tokenizer(model_path, max_length)?;
        let config: RobertaConfig = parse_json_config(&model_path.join("config.json"))?;
        let vb = load_var_builder(model_path, device)?;

        let model = load_with_prefixes(&vb, &["", "model"], "RoBERTa sequence model", |vb| {
            XLMRobertaForSequenceClassification::new(NUM_LABELS, &config, vb)
        })?;

        tracing::info!(model = %name, path = %model_path.display(), max_length, "Loaded RoBERTa sequence classifier");

        Ok(Self {
            name,
            tokenizer,
            model,
            device: device.clone(),
        })
    }
}

#[async_trait]
impl TextClassifier for RobertaSequenceClassifier {
    async fn predict(&self, text: &str) -> Result<ClassificationResult> {
        let (input_ids, token_type_ids, attention_mask) =
            encode(&self.tokenizer, text, &self.device)?;

        let logits = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids)
            .map_err(candle_err("forward pass"))?;

        to_result(&logits)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
