pub mod job;

pub use job::{
    ErrorBody, JobListing, ProcessingBody, RawJobListing, SalaryEstimateRequest,
    SalaryEstimateResponse, SearchMetadata, SearchResponseBody, SearchResultPage,
};
