//! Browser tests for the JS bindings. Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use fabulacore::FabulaCortex;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn null_config_uses_defaults() {
    let cortex = FabulaCortex::js_new(JsValue::NULL).unwrap();
    assert!(cortex.js_version().starts_with("fabulacore v"));
}

#[wasm_bindgen_test]
fn malformed_document_is_rejected() {
    let cortex = FabulaCortex::js_new(JsValue::UNDEFINED).unwrap();
    let err = cortex.js_analyze(JsValue::from_str("not a document")).unwrap_err();
    assert!(err.as_string().unwrap_or_default().starts_with("Failed to parse document"));
}

#[wasm_bindgen_test]
fn empty_timeline_builds() {
    let cortex = FabulaCortex::js_new(JsValue::NULL).unwrap();
    let markers = serde_wasm_bindgen::to_value(&Vec::<u8>::new()).unwrap();
    let chapters = serde_wasm_bindgen::to_value(&Vec::<u8>::new()).unwrap();
    let view = cortex.js_build_timeline(markers, chapters).unwrap();
    assert!(view.is_object());
}
