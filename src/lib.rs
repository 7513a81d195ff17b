pub mod address;
pub mod config;
pub mod engine;
pub mod lists;
pub mod milter;
pub mod normalize;
pub mod outcome;
pub mod reload;
pub mod results;
pub mod tld;

pub use address::{parse_address, MailAddr};
pub use config::Config;
pub use engine::{AccessEngine, AnyProbe, ConnContext, TxnContext};
pub use milter::Milter;
pub use outcome::Outcome;
pub use results::{Annotation, ResultSink};
