pub mod extractor;
pub mod fetcher;

pub use extractor::SettingsJsonExtractor;
pub use fetcher::ReqwestFetcher;
