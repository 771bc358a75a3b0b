// Production implementations of the pipeline's trait seams.

pub mod openai_oracle;
pub mod perplexity;
pub mod x_feed;
pub mod x_publisher;

pub use openai_oracle::OpenAiOracle;
pub use perplexity::PerplexityResearcher;
pub use x_feed::XFeed;
pub use x_publisher::XPublisher;
