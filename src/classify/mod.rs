//! Routes articles to tracked-person buckets by name-pattern membership.
//!
//! An article whose text matches exactly one person goes to that person's
//! bucket, one matching several goes to [`MIXED`], one matching nobody is
//! dropped. The decision depends only on the set of matching persons, so the
//! order of patterns and articles never changes the outcome.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::RawArticle;

/// Category label stored for articles that mention more than one person.
pub const MIXED: &str = "Mixed";

/// A person to follow: the provider search query and the patterns that
/// recognize them in lowercased article text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPerson {
    pub label: String,
    pub query: String,
    pub patterns: Vec<String>,
}

impl TrackedPerson {
    pub fn new(label: &str, query: &str, patterns: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            query: query.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

pub fn default_persons() -> Vec<TrackedPerson> {
    vec![
        TrackedPerson::new("Trump", "Trump", &[r"\btrump\b"]),
        TrackedPerson::new("Putin", "Putin", &[r"\bputin\b"]),
        TrackedPerson::new("Xi", "\"Xi Jinping\"", &[r"\bxi\s+j(?:i|inping)\b"]),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    Person(String),
    Mixed,
}

struct PersonMatcher {
    label: String,
    patterns: Vec<Regex>,
}

impl PersonMatcher {
    fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

pub struct Classifier {
    matchers: Vec<PersonMatcher>,
}

impl Classifier {
    pub fn new(persons: &[TrackedPerson]) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut matchers = Vec::with_capacity(persons.len());

        for person in persons {
            if person.label == MIXED {
                return Err(AppError::Config(format!(
                    "'{MIXED}' is reserved and cannot name a tracked person"
                )));
            }
            if !seen.insert(person.label.as_str()) {
                return Err(AppError::Config(format!(
                    "tracked person '{}' is listed twice",
                    person.label
                )));
            }
            if person.patterns.is_empty() {
                return Err(AppError::Config(format!(
                    "tracked person '{}' has no name patterns",
                    person.label
                )));
            }

            let patterns = person
                .patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            matchers.push(PersonMatcher {
                label: person.label.clone(),
                patterns,
            });
        }

        Ok(Self { matchers })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().map(|m| m.label.as_str())
    }

    /// Labels of every person whose patterns match the article.
    pub fn matches(&self, article: &RawArticle) -> BTreeSet<&str> {
        let text = article.text().to_lowercase();
        self.matchers
            .iter()
            .filter(|m| m.is_match(&text))
            .map(|m| m.label.as_str())
            .collect()
    }

    pub fn bucket_for(&self, article: &RawArticle) -> Option<Bucket> {
        let hits = self.matches(article);
        match hits.len() {
            0 => None,
            1 => hits.into_iter().next().map(|l| Bucket::Person(l.to_string())),
            _ => Some(Bucket::Mixed),
        }
    }

    pub fn classify(&self, articles: Vec<RawArticle>) -> Classification {
        let mut classification = Classification {
            buckets: self
                .labels()
                .map(|label| (label.to_string(), Vec::new()))
                .collect(),
            ..Default::default()
        };

        for article in articles {
            match self.bucket_for(&article) {
                Some(Bucket::Person(label)) => classification
                    .buckets
                    .entry(label)
                    .or_default()
                    .push(article),
                Some(Bucket::Mixed) => classification.mixed.push(article),
                None => classification.dropped += 1,
            }
        }

        classification
    }
}

/// The partition produced by [`Classifier::classify`].
#[derive(Debug, Default)]
pub struct Classification {
    pub buckets: BTreeMap<String, Vec<RawArticle>>,
    pub mixed: Vec<RawArticle>,
    pub dropped: usize,
}

impl Classification {
    #[allow(dead_code)]
    pub fn bucket(&self, label: &str) -> &[RawArticle] {
        if label == MIXED {
            return &self.mixed;
        }
        self.buckets.get(label).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn kept(&self) -> usize {
        self.buckets.values().map(Vec::len).sum::<usize>() + self.mixed.len()
    }

    /// `(category, rows)` pairs ready for the store, persons first, mixed last.
    pub fn into_batches(self) -> Vec<(String, Vec<RawArticle>)> {
        let mut batches: Vec<_> = self.buckets.into_iter().collect();
        batches.push((MIXED.to_string(), self.mixed));
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, title: &str) -> RawArticle {
        RawArticle {
            source: "Test Wire".into(),
            title: Some(title.into()),
            url: url.into(),
            ..Default::default()
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(&default_persons()).unwrap()
    }

    #[test]
    fn three_article_scenario() {
        let result = classifier().classify(vec![
            article("https://a.test/1", "Trump signs order"),
            article("https://a.test/2", "Putin and Xi Jinping meet"),
            article("https://a.test/3", "Local weather report"),
        ]);

        let trump: Vec<_> = result.bucket("Trump").iter().map(|a| a.url.as_str()).collect();
        let mixed: Vec<_> = result.bucket(MIXED).iter().map(|a| a.url.as_str()).collect();

        assert_eq!(trump, vec!["https://a.test/1"]);
        assert_eq!(mixed, vec!["https://a.test/2"]);
        assert!(result.bucket("Putin").is_empty());
        assert!(result.bucket("Xi").is_empty());
        assert_eq!(result.dropped, 1);
        assert_eq!(result.kept(), 2);
    }

    #[test]
    fn single_match_never_reaches_other_buckets() {
        let result = classifier().classify(vec![article("u1", "PUTIN speaks in Moscow")]);
        assert_eq!(result.bucket("Putin").len(), 1);
        assert!(result.bucket("Trump").is_empty());
        assert!(result.bucket(MIXED).is_empty());
    }

    #[test]
    fn word_boundaries_are_respected() {
        let c = classifier();
        assert!(c.bucket_for(&article("u", "Trumpet sales rise")).is_none());
        assert!(c.bucket_for(&article("u", "Xi's policy")).is_none());
        assert_eq!(
            c.bucket_for(&article("u", "President Xi  Jinping visits")),
            Some(Bucket::Person("Xi".into()))
        );
    }

    #[test]
    fn description_and_content_are_searched() {
        let raw = RawArticle {
            title: Some("Summit opens".into()),
            description: Some("Leaders gather".into()),
            content: Some("Donald Trump arrived late".into()),
            url: "u".into(),
            ..Default::default()
        };
        assert_eq!(
            classifier().bucket_for(&raw),
            Some(Bucket::Person("Trump".into()))
        );
    }

    #[test]
    fn outcome_is_independent_of_person_order() {
        let mut reversed = default_persons();
        reversed.reverse();
        let forward = classifier();
        let backward = Classifier::new(&reversed).unwrap();
        let raw = article("u", "Trump calls Putin");
        assert_eq!(forward.bucket_for(&raw), Some(Bucket::Mixed));
        assert_eq!(backward.bucket_for(&raw), Some(Bucket::Mixed));
    }

    #[test]
    fn batches_list_persons_then_mixed() {
        let batches = classifier()
            .classify(vec![article("u", "Trump and Putin")])
            .into_batches();
        let labels: Vec<_> = batches.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["Putin", "Trump", "Xi", MIXED]);
        assert_eq!(batches[3].1.len(), 1);
    }

    #[test]
    fn invalid_person_tables_are_rejected() {
        let reserved = vec![TrackedPerson::new(MIXED, "x", &["x"])];
        assert!(matches!(Classifier::new(&reserved), Err(AppError::Config(_))));

        let duplicate = vec![
            TrackedPerson::new("Trump", "Trump", &["trump"]),
            TrackedPerson::new("Trump", "Trump", &["donald"]),
        ];
        assert!(matches!(Classifier::new(&duplicate), Err(AppError::Config(_))));

        let bad_regex = vec![TrackedPerson::new("Bad", "bad", &["(unclosed"])];
        assert!(matches!(Classifier::new(&bad_regex), Err(AppError::Pattern(_))));
    }
}
