//! Timeline construction and narrative-order classification
//!
//! # Usage
//! ```rust,ignore
//! let builder = TimelineBuilder::new(BuilderConfig::default())?;
//! let mut timeline = builder.build(&markers, &chapters)?;
//!
//! let classifier = NarrativeOrderClassifier::new(OrderConfig::default())?;
//! let report = classifier.classify(&mut timeline);
//! println!("{} flashbacks", report.analepsis);
//! ```

pub mod builder;
pub mod lexicon;
pub mod marker;
pub mod model;
pub mod order;
pub mod summary;

#[cfg(test)]
mod tests;

pub use builder::TimelineBuilder;
pub use lexicon::{IdiomShift, LexiconKind, TemporalLexicon};
pub use marker::{
    AgeValue, Direction, LifePhase, MarkerKind, Season, SourceSpan, TemporalMarker, TimeUnit,
};
pub use model::{
    ChapterInfo, DateResolution, EventId, EventKind, EventReference, NarrativeOrder, StoryDate,
    StoryTime, TimeFrame, TimeSpan, Timeline, TimelineEvent,
};
pub use order::{NarrativeOrderClassifier, OrderReport};
pub use summary::TimelineSummary;
