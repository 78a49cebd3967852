//! Candle-backed BERT-family sequence classifier.
//!
//! Loads weights, config and tokenizer from a Hugging Face repo (or a local
//! directory), reads the label set from the model's own `id2label` at load
//! time, and scores batches with independent per-label sigmoids. Load
//! failures are fatal: the pipeline never starts with a broken model.

use crate::classifier::TextClassifier;
use anyhow::{anyhow, bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

/// Sequence-classification head variants seen across the BERT family:
/// single linear (BERT) or dense+tanh+projection (RoBERTa).
enum ClassifierHead {
    Linear(Linear),
    Roberta { dense: Linear, out_proj: Linear },
}

impl ClassifierHead {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            ClassifierHead::Linear(l) => l.forward(xs),
            ClassifierHead::Roberta { dense, out_proj } => {
                out_proj.forward(&dense.forward(xs)?.tanh()?)
            }
        }
    }
}

pub struct BertSequenceClassifier {
    tokenizer: Tokenizer,
    model: BertModel,
    head: ClassifierHead,
    device: Device,
    labels: Vec<String>,
}

impl BertSequenceClassifier {
    /// Load from a Hugging Face repo id or a local model directory.
    /// `max_input_tokens` is the per-item truncation limit.
    pub fn load(model_id: &str, max_input_tokens: usize) -> Result<Self> {
        let dir = resolve_model_dir(model_id)
            .with_context(|| format!("resolve model files for '{model_id}'"))?;
        Self::load_from_dir(&dir, max_input_tokens)
    }

    pub fn load_from_dir(dir: &Path, max_input_tokens: usize) -> Result<Self> {
        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(dir.join("config.json"))
            .with_context(|| format!("read {}", dir.join("config.json").display()))?;
        let labels = labels_from_config(&config_str)?;
        let bert_config: BertConfig =
            serde_json::from_str(&config_str).context("parse model config")?;

        let mut tokenizer = load_tokenizer(dir)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_input_tokens,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("configure truncation: {e}"))?;
        tokenizer.with_padding(Some(PaddingParams::default()));

        let vb = load_var_builder(dir, &device)?;
        let model = load_backbone(&vb, &bert_config)?;
        let head = load_head(&vb, bert_config.hidden_size, labels.len())?;

        tracing::info!(
            model = %dir.display(),
            num_labels = labels.len(),
            labels = ?labels,
            "model loaded"
        );

        Ok(Self { tokenizer, model, head, device, labels })
    }
}

impl TextClassifier for BertSequenceClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;

        let batch = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut type_ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for enc in &encodings {
            ids.extend_from_slice(enc.get_ids());
            type_ids.extend_from_slice(enc.get_type_ids());
            mask.extend_from_slice(enc.get_attention_mask());
        }

        let input_ids = Tensor::from_vec(ids, (batch, seq_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(type_ids, (batch, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch, seq_len), &self.device)?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        // CLS-token pooling: [batch, seq, hidden] -> [batch, hidden].
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let logits = self.head.forward(&cls)?;
        // Independent per-label probabilities, not a softmax distribution.
        let probs = candle_nn::ops::sigmoid(&logits)?;
        Ok(probs.to_vec2::<f32>()?)
    }
}

/// Local directory passes through; anything else is fetched from the hub
/// (weights, config, tokenizer) into the shared cache.
fn resolve_model_dir(model_id: &str) -> Result<PathBuf> {
    let as_path = Path::new(model_id);
    if as_path.is_dir() {
        return Ok(as_path.to_path_buf());
    }

    let api = hf_hub::api::sync::Api::new().context("initialize Hugging Face hub API")?;
    let repo = api.repo(hf_hub::Repo::model(model_id.to_string()));

    let config_path = repo.get("config.json").context("download config.json")?;
    for file in ["model.safetensors", "pytorch_model.bin"] {
        if repo.get(file).is_ok() {
            break;
        }
    }
    for file in ["tokenizer.json", "vocab.txt", "tokenizer_config.json", "special_tokens_map.json"]
    {
        let _ = repo.get(file);
    }

    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| anyhow!("invalid hub cache path"))
}

/// Label names from the checkpoint's `id2label`, ordered by output index.
/// Falls back to `label_<i>` when the config only carries a label count.
fn labels_from_config(config_str: &str) -> Result<Vec<String>> {
    let config: serde_json::Value = serde_json::from_str(config_str).context("parse config.json")?;

    if let Some(map) = config.get("id2label").and_then(|v| v.as_object()) {
        let mut indexed: Vec<(usize, String)> = Vec::with_capacity(map.len());
        for (k, v) in map {
            let idx: usize = k.parse().map_err(|_| anyhow!("non-numeric id2label key '{k}'"))?;
            let label =
                v.as_str().ok_or_else(|| anyhow!("non-string id2label value for '{k}'"))?;
            indexed.push((idx, label.to_string()));
        }
        indexed.sort_by_key(|(i, _)| *i);
        return Ok(indexed.into_iter().map(|(_, l)| l).collect());
    }

    if let Some(n) = config.get("num_labels").and_then(|v| v.as_u64()) {
        return Ok((0..n).map(|i| format!("label_{i}")).collect());
    }

    bail!("model config carries neither id2label nor num_labels");
}

fn load_tokenizer(dir: &Path) -> Result<Tokenizer> {
    let tokenizer_json = dir.join("tokenizer.json");
    if tokenizer_json.exists() {
        return Tokenizer::from_file(&tokenizer_json)
            .map_err(|e| anyhow!("load tokenizer.json: {e}"));
    }

    // Older BERT checkpoints ship only vocab.txt; rebuild the WordPiece stack.
    let vocab = dir.join("vocab.txt");
    if vocab.exists() {
        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| anyhow!("build WordPiece from vocab.txt: {e}"))?;
        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), 102),
            ("[CLS]".to_string(), 101),
        )));
        return Ok(tokenizer);
    }

    bail!("no tokenizer found in {} (tried tokenizer.json, vocab.txt)", dir.display());
}

fn load_var_builder(dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = dir.join("model.safetensors");
    if safetensors.exists() {
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)
                .context("load model.safetensors")?
        };
        return Ok(vb);
    }
    let pth = dir.join("pytorch_model.bin");
    if pth.exists() {
        return VarBuilder::from_pth(&pth, DType::F32, device).context("load pytorch_model.bin");
    }
    bail!(
        "no model weights in {} (tried model.safetensors, pytorch_model.bin)",
        dir.display()
    );
}

/// The backbone tensor prefix varies across exports; probe the usual ones.
fn load_backbone(vb: &VarBuilder, config: &BertConfig) -> Result<BertModel> {
    let mut errors = Vec::new();
    for prefix in ["bert", "roberta", ""] {
        let vb_prefix = if prefix.is_empty() { vb.clone() } else { vb.pp(prefix) };
        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                tracing::debug!(prefix = if prefix.is_empty() { "<root>" } else { prefix },
                    "loaded backbone");
                return Ok(model);
            }
            Err(e) => errors.push(format!(
                "{}: {e}",
                if prefix.is_empty() { "<root>" } else { prefix }
            )),
        }
    }
    bail!("failed to load BERT backbone (tried [{}])", errors.join(" | "));
}

fn load_head(vb: &VarBuilder, hidden_size: usize, num_labels: usize) -> Result<ClassifierHead> {
    if let Ok(linear) = candle_nn::linear(hidden_size, num_labels, vb.pp("classifier")) {
        return Ok(ClassifierHead::Linear(linear));
    }
    let cls = vb.pp("classifier");
    let dense = candle_nn::linear(hidden_size, hidden_size, cls.pp("dense"));
    let out_proj = candle_nn::linear(hidden_size, num_labels, cls.pp("out_proj"));
    if let (Ok(dense), Ok(out_proj)) = (dense, out_proj) {
        return Ok(ClassifierHead::Roberta { dense, out_proj });
    }
    bail!("no sequence-classification head found (tried classifier, classifier.dense/out_proj)");
}
