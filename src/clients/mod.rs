pub mod competitor_client;
pub mod deck_client;
pub mod http;
pub mod scrape_client;

pub use competitor_client::{CompetitorClient, CompetitorRequest};
pub use deck_client::DeckParserClient;
pub use scrape_client::ScrapeClient;
