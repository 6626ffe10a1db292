mod fetcher;
mod sources;

pub use fetcher::FeedFetcher;
pub use sources::{default_feeds, FeedSource};
