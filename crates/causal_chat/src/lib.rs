//! Escalation signal analysis for customer-service transcripts.
//!
//! Turns are scanned with a keyword rule table ([`signals`]); the resulting
//! signals are aggregated into ranked causes ([`causes`]), early warnings
//! ([`early_warning`]) and sliding-window risk scores ([`risk`]).
//! [`analyzer::CausalAnalyzer`] runs all of them from one configuration.

pub mod analyzer;
pub mod causes;
pub mod early_warning;
pub mod errors;
pub mod report;
pub mod risk;
pub mod signals;
pub mod transcripts;
pub mod utils;
