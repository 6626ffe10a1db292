mod huggingface;
mod lexicon;
mod tagger;

pub use huggingface::{HuggingFaceClassifier, DEFAULT_MODEL, HF_INFERENCE_URL};
pub use lexicon::LexiconClassifier;
pub use tagger::{SentimentTagger, TagReport};
