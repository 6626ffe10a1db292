//! Offline polarity scorer for political news headlines.

use crate::models::Sentiment;

/// Word weights. Keys are lowercase single words; positive weights lie in
/// `(0.0, 1.0]`, negative ones in `[-1.0, 0.0)`.
const LEXICON: &[(&str, f32)] = &[
    // Positive
    ("agreement", 0.4),
    ("agree", 0.3),
    ("agreed", 0.3),
    ("peace", 0.5),
    ("ceasefire", 0.4),
    ("deal", 0.3),
    ("support", 0.3),
    ("supports", 0.3),
    ("praise", 0.4),
    ("praised", 0.4),
    ("welcome", 0.3),
    ("welcomed", 0.3),
    ("success", 0.5),
    ("successful", 0.5),
    ("win", 0.4),
    ("wins", 0.4),
    ("victory", 0.5),
    ("growth", 0.3),
    ("boost", 0.3),
    ("progress", 0.4),
    ("cooperation", 0.4),
    ("hope", 0.3),
    ("historic", 0.3),
    ("good", 0.3),
    ("great", 0.4),
    ("positive", 0.4),
    ("stable", 0.3),
    ("strong", 0.3),
    // Negative
    ("war", -0.6),
    ("attack", -0.6),
    ("attacks", -0.6),
    ("strike", -0.4),
    ("strikes", -0.4),
    ("killed", -0.7),
    ("dead", -0.6),
    ("death", -0.6),
    ("crisis", -0.5),
    ("sanctions", -0.4),
    ("sanction", -0.4),
    ("threat", -0.5),
    ("threatens", -0.5),
    ("condemn", -0.5),
    ("condemned", -0.5),
    ("accuse", -0.4),
    ("accused", -0.4),
    ("criticism", -0.4),
    ("criticized", -0.4),
    ("scandal", -0.5),
    ("indictment", -0.5),
    ("indicted", -0.5),
    ("fraud", -0.6),
    ("protest", -0.3),
    ("protests", -0.3),
    ("tariff", -0.2),
    ("tariffs", -0.2),
    ("fear", -0.4),
    ("fears", -0.4),
    ("collapse", -0.6),
    ("failed", -0.4),
    ("failure", -0.4),
    ("bad", -0.4),
    ("tension", -0.3),
    ("tensions", -0.3),
    ("violence", -0.6),
];

/// Sum of matching word weights, clamped to `[-1.0, 1.0]`.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex, _)| *lex == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct LexiconClassifier {
    threshold: f32,
}

impl LexiconClassifier {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.abs(),
        }
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        Sentiment::from_score(lexicon_score(text), self.threshold)
    }
}
