//! Ticket normalization pipeline: turning a betting-slip image into a
//! normalized [`WageringTicketDraft`](crate::models::WageringTicketDraft).

pub mod acquisition;
pub mod extraction;
pub mod normalize;
pub mod pipeline;
pub mod providers;
pub mod recognition;

pub use acquisition::{PlatformTicketSource, ResolvedFile, TicketSource};
pub use extraction::{ExtractorChain, RawTicket, TicketExtractor, TicketImage};
pub use pipeline::{build_extractor, TicketPipeline};
