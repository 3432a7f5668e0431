// punch-domain library entry point
pub mod error;
pub mod json;
pub mod link;
pub mod outcome;
pub mod params;
pub mod provider;
pub mod punch;
pub use error::DomainError;
pub use link::{IdentityLink, LinkResolution, LinkStatus};
pub use outcome::{IngestOutcome, IngestResult};
pub use params::{LinkTouch, PunchSubmission, SubmitPunchParams, TouchLinkParams};
pub use provider::Provider;
pub use punch::{ExternalPunch, PunchEvent, PunchType};
