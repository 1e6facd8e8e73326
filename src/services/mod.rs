pub mod droid;
pub mod extractor;
pub mod fetcher;
pub mod gatherer;
pub mod orchestrator;
pub mod pipeline;
pub mod resolver;
pub mod searcher;
pub mod throttle;

pub use droid::*;
pub use extractor::*;
pub use fetcher::*;
pub use gatherer::*;
pub use orchestrator::*;
pub use pipeline::*;
pub use resolver::*;
pub use searcher::*;
pub use throttle::*;
