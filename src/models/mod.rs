mod article;
mod sentiment;

pub use article::{clean_text, Article, RawArticle, UnscoredRow};
pub use sentiment::Sentiment;
