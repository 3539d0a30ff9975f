pub mod health;
pub mod scrape;
