pub mod batch;
pub mod token_bucket;

pub use batch::BatchScheduler;
pub use token_bucket::TokenBucket;
