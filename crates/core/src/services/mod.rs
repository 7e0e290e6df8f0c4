pub mod currency_format;
pub mod extraction_client;
pub mod prompts;
pub mod response_parser;
