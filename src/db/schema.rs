pub const SCHEMA: &str = r#"
-- news table
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT,
    title TEXT,
    url TEXT UNIQUE NOT NULL,
    published_at TEXT,
    content TEXT,
    author TEXT,
    politician TEXT NOT NULL,
    sentiment TEXT
);

CREATE INDEX IF NOT EXISTS idx_news_published_at ON news(published_at);
CREATE INDEX IF NOT EXISTS idx_news_sentiment ON news(sentiment);

-- newest publish date seen per API provider
CREATE TABLE IF NOT EXISTS fetch_checkpoints (
    provider TEXT PRIMARY KEY,
    last_published TEXT NOT NULL
);
"#;
