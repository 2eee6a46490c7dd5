pub mod job;
pub mod loaders;
pub mod progress;
pub mod request;
pub mod response;

pub use job::{AnalysisDimensions, Job, JobResult};
pub use loaders::load_batch_request;
pub use progress::ProgressEvent;
pub use request::{BatchRequest, CancellationPolicy, ProgressMode, RunOptions};
pub use response::BatchResponse;
