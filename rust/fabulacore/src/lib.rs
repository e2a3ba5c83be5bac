//! FabulaCore: Narrative Temporal Reasoning Engine
//!
//! A Rust/WASM engine that turns temporal markers extracted from a story into
//! a story-time timeline, tells flashbacks and flash-forwards apart from
//! chronological narration, and reports temporal inconsistencies confirmed by
//! several independent detection methods.
//!
//! # Architecture
//!
//! ## Timeline (`timeline/`)
//! - `marker.rs` - TemporalMarker: input contract from the extraction stage
//! - `builder.rs` - TimelineBuilder: anchors, absolute dates, relative offsets
//! - `order.rs` - NarrativeOrderClassifier: analepsis / prolepsis detection
//! - `lexicon.rs` - TemporalLexicon: flashback cues, idioms, calendar words
//!
//! ## Consensus (`consensus/`)
//! - `aggregator.rs` - ConsensusAggregator: weighted voting over any method set
//! - `attribute.rs` - AttributeConsensus: character attribute conflicts
//!
//! ## Detection (`detect/`)
//! - `sources.rs` - candidate sources (impossible sequences, ages, anachronisms)
//! - `contextual.rs` / `heuristic.rs` / `semantic.rs` - assessing methods
//! - `checker.rs` - TemporalChecker: candidates → votes → ranked findings
//!
//! ## Routing
//! - `router.rs` - ComplexityRouter: decides when the semantic tier is worth it
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { FabulaCortex } from 'fabulacore';
//!
//! await init();
//! const cortex = new FabulaCortex();
//!
//! const analysis = cortex.analyze({
//!   markers: [{ text: 'March 1, 1850', span: { start: 10, end: 23, chapter: 1, paragraph: 0 },
//!               kind: { type: 'absolute_date', year: 1850, month: 3, day: 1 }, confidence: 0.9 }],
//!   chapters: [{ number: 1, title: 'Arrival', start_offset: 0 }],
//! });
//! console.log(analysis.order);             // chronological / analepsis / prolepsis counts
//! console.log(analysis.temporal.findings); // ranked inconsistencies
//! ```
//!
//! # Usage (Rust)
//! ```rust,ignore
//! let engine = NarrativeEngine::new(EngineConfig::from_toml(&std::fs::read_to_string("fabula.toml")?)?)?;
//! let analysis = engine.analyze(&DocumentInput::new(markers, chapters))?;
//! ```

pub mod config;
pub mod consensus;
pub mod detect;
pub mod engine;
pub mod error;
pub mod router;
pub mod timeline;
pub mod wasm;

pub(crate) mod parallel;

// Public exports
pub use config::EngineConfig;
pub use consensus::{ConsensusAggregator, ConsensusFinding, ConsensusLevel};
pub use detect::{CheckReport, InconsistencyCandidate, InconsistencyKind, Severity, TemporalChecker, TemporalFinding};
pub use engine::{CancellationFlag, DocumentAnalysis, DocumentInput, DocumentOutcome, NarrativeEngine};
pub use error::{EngineError, EngineResult};
pub use router::{ComplexityRouter, ComplexityScore};
pub use timeline::{
    ChapterInfo, NarrativeOrder, NarrativeOrderClassifier, OrderReport, TemporalMarker, Timeline,
    TimelineBuilder,
};
pub use wasm::FabulaCortex;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("fabulacore v{}", env!("CARGO_PKG_VERSION"))
}
