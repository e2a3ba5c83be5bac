//! FabulaCortex - WASM facade over `NarrativeEngine`
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { FabulaCortex } from 'fabulacore';
//!
//! await init();
//! const cortex = new FabulaCortex({ semantic_enabled: false });
//!
//! const { timeline, order } = cortex.buildTimeline(markers, chapters);
//! const analysis = cortex.analyze({ markers, chapters, text });
//! console.log(analysis.temporal.findings);
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::consensus::AttributeBatch;
use crate::engine::{DocumentInput, NarrativeEngine};
use crate::error::EngineResult;
use crate::timeline::{ChapterInfo, OrderReport, TemporalMarker, Timeline, TimelineSummary};

/// Timeline view returned by `buildTimeline`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TimelineView {
    pub timeline: Timeline,
    pub order: OrderReport,
    pub summary: TimelineSummary,
}

#[wasm_bindgen]
pub struct FabulaCortex {
    engine: NarrativeEngine,
}

impl FabulaCortex {
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        Ok(Self {
            engine: NarrativeEngine::new(config)?,
        })
    }

    pub fn engine(&self) -> &NarrativeEngine {
        &self.engine
    }

    pub fn timeline_view(&self, markers: &[TemporalMarker], chapters: &[ChapterInfo]) -> EngineResult<TimelineView> {
        let (timeline, order) = self.engine.build_timeline(markers, chapters)?;
        let summary = timeline.summary();
        Ok(TimelineView { timeline, order, summary })
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

#[wasm_bindgen]
impl FabulaCortex {
    /// Create a cortex (JS binding). `config` may be null/undefined for defaults.
    #[wasm_bindgen(constructor)]
    pub fn js_new(config: JsValue) -> Result<FabulaCortex, JsValue> {
        let config: EngineConfig = if config.is_undefined() || config.is_null() {
            EngineConfig::default()
        } else {
            parse(config, "config")?
        };
        Self::from_config(config).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Build and classify a timeline (JS binding)
    /// Expects arrays of markers and { number, title, start_offset } chapters
    #[wasm_bindgen(js_name = buildTimeline)]
    pub fn js_build_timeline(&self, markers: JsValue, chapters: JsValue) -> Result<JsValue, JsValue> {
        let markers: Vec<TemporalMarker> = parse(markers, "markers")?;
        let chapters: Vec<ChapterInfo> = parse(chapters, "chapters")?;
        let view = self
            .timeline_view(&markers, &chapters)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&view)
    }

    /// Full per-document analysis (JS binding)
    /// Expects { markers, chapters, text? }
    #[wasm_bindgen(js_name = analyze)]
    pub fn js_analyze(&self, document: JsValue) -> Result<JsValue, JsValue> {
        let input: DocumentInput = parse(document, "document")?;
        let analysis = self
            .engine
            .analyze(&input)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&analysis)
    }

    /// Complexity score and recommended methods (JS binding)
    #[wasm_bindgen(js_name = complexity)]
    pub fn js_complexity(&self, text: &str) -> JsValue {
        to_js(&self.engine.complexity(text)).unwrap_or(JsValue::NULL)
    }

    /// Resolve attribute conflicts (JS binding)
    /// Expects [{ method, claims: [{ entity, attribute, value, confidence }] }]
    #[wasm_bindgen(js_name = aggregateAttributes)]
    pub fn js_aggregate_attributes(&self, batches: JsValue) -> Result<JsValue, JsValue> {
        let batches: Vec<AttributeBatch> = parse(batches, "attribute batches")?;
        let findings = self
            .engine
            .resolve_attributes(&batches)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&findings)
    }

    /// Version string (JS binding)
    #[wasm_bindgen(js_name = version)]
    pub fn js_version(&self) -> String {
        crate::version()
    }
}

fn parse<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse {}: {}", what, e)))
}

/// Plain JS objects, not `Map`s, so results survive `JSON.stringify`
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| {
            web_sys::console::error_1(&format!("[FabulaCortex] Serialization failed: {:?}", e).into());
            JsValue::from_str(&e.to_string())
        })
}
