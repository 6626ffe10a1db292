use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// World and politics feeds across Chinese, Russian and international outlets.
const DEFAULT_FEEDS: &[(&str, &str)] = &[
    // China
    ("Xinhua English", "http://www.xinhuanet.com/english/rss/worldrss.xml"),
    ("China Daily", "http://www.chinadaily.com.cn/rss/world_rss.xml"),
    ("CGTN", "https://news.cgtn.com/home/rss/CGTN24hr_EN.xml"),
    ("Global Times", "https://www.globaltimes.cn/rss/home.xml"),
    ("South China Morning Post", "https://www.scmp.com/rss/91/feed"),
    ("People's Daily (EN)", "http://en.people.cn/rss/politics.xml"),
    ("China News Service", "http://www.ecns.cn/rss/rss.xml"),
    ("Sixth Tone", "https://www.sixthtone.com/rss"),
    ("Caixin Global", "https://www.caixinglobal.com/rss.xml"),
    // Russia
    ("TASS", "https://tass.com/rss/v2.xml?departments=politics"),
    ("RIA Novosti", "https://ria.ru/export/rss2/politics/index.xml"),
    ("RBC Politics", "https://rssexport.rbc.ru/rbc/logical/footer/news.rss"),
    ("Meduza EN", "https://meduza.io/rss/en/all"),
    ("Kommersant", "https://www.kommersant.ru/RSS/news.xml"),
    ("Gazeta.Ru Politics", "https://www.gazeta.ru/export/rss/politics.xml"),
    ("Lenta.Ru Politics", "https://lenta.ru/rss/news/politics/"),
    ("RT English", "https://www.rt.com/rss/news/"),
    // International
    ("Reuters World", "http://feeds.reuters.com/Reuters/worldNews"),
    ("Reuters Politics", "http://feeds.reuters.com/Reuters/PoliticsNews"),
    ("AP Politics", "https://apnews.com/hub/politics?outputType=xml"),
    ("BBC World", "http://feeds.bbci.co.uk/news/world/rss.xml"),
    ("CNN World", "http://rss.cnn.com/rss/edition_world.rss"),
    ("NYT Politics", "https://rss.nytimes.com/services/xml/rss/nyt/Politics.xml"),
    ("WP Politics", "http://feeds.washingtonpost.com/rss/politics"),
    ("Fox News Politics", "http://feeds.foxnews.com/foxnews/politics"),
    ("Politico", "https://www.politico.com/rss/politics.xml"),
    ("Axios Politics", "https://www.axios.com/feeds/politics.xml"),
    ("Bloomberg Politics", "https://www.bloomberg.com/politics/rss.xml"),
    ("FT Politics", "http://www.ft.com/rss/world/uk"),
    ("Guardian Politics", "https://www.theguardian.com/politics/rss"),
    ("The Hill", "https://thehill.com/rss/syndicator/19110"),
    ("NPR Politics", "https://www.npr.org/rss/rss.php?id=1014"),
    ("Politico Europe", "https://www.politico.eu/feed/"),
    ("Deutsche Welle", "https://rss.dw.com/xml/rss-en-politics"),
    ("France24 Politics", "https://www.france24.com/en/rss/politics.xml"),
    ("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml?language=en"),
    ("AFP Top News", "https://www.afp.com/rss.xml?category=world"),
    ("DW Politics", "https://rss.dw.com/rdf/rss-en-pol"),
    ("AP International", "https://apnews.com/hub/international-news?outputType=xml"),
    ("Foreign Policy", "https://foreignpolicy.com/feed/"),
    ("Straits Times", "https://www.straitstimes.com/news/world/rss.xml"),
    ("Japan Times", "https://www.japantimes.co.jp/feed/topstories/"),
    ("Times of India", "https://timesofindia.indiatimes.com/rssfeeds/296589292.cms"),
    ("Haaretz International", "https://www.haaretz.com/srv/feed/feedsIntlFrontPage.xml"),
    ("Sydney Morning Herald", "https://www.smh.com.au/rss/world.xml"),
    ("Toronto Star World", "https://www.thestar.com/content/feeds.world.rss"),
    ("Brazilian Report", "https://brazilian.report/feed/"),
    ("Africa News", "https://www.africanews.com/feed/"),
    ("Middle East Eye", "https://www.middleeasteye.net/rss.xml"),
    ("ASEAN Today", "https://www.aseantoday.com/feed/"),
];

pub fn default_feeds() -> Vec<FeedSource> {
    DEFAULT_FEEDS
        .iter()
        .map(|(name, url)| FeedSource {
            name: name.to_string(),
            url: url.to_string(),
        })
        .collect()
}
