//! WebAssembly module for the pharmacy back-office
//!
//! Lets the receipt entry form value a draft in the browser with the same
//! code the server uses on commit:
//! - Line item recalculation after an edit
//! - GST slab breakup and invoice summary
//! - Adjustment reason checks

use rust_decimal::Decimal;
use shared::{
    apply_edit, recalculate_item, validate_adjustment_reason, DraftReceipt, LineItem, LineItemEdit,
};
use std::str::FromStr;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(message: String) -> JsValue {
    js_sys::Error::new(&message).into()
}

fn recalculate_line_item_json(item_json: &str) -> Result<String, String> {
    let item: LineItem =
        serde_json::from_str(item_json).map_err(|e| format!("Invalid line item JSON: {}", e))?;
    let item = recalculate_item(item).map_err(|e| e.to_string())?;
    serde_json::to_string(&item).map_err(|e| e.to_string())
}

fn edit_line_item_json(item_json: &str, edit_json: &str) -> Result<String, String> {
    let item: LineItem =
        serde_json::from_str(item_json).map_err(|e| format!("Invalid line item JSON: {}", e))?;
    let edit: LineItemEdit =
        serde_json::from_str(edit_json).map_err(|e| format!("Invalid edit JSON: {}", e))?;
    let item = apply_edit(item, edit).map_err(|e| e.to_string())?;
    serde_json::to_string(&item).map_err(|e| e.to_string())
}

fn summarize_receipt_json(draft_json: &str) -> Result<(String, usize), String> {
    // Deserializing recomputes every derived figure
    let draft: DraftReceipt =
        serde_json::from_str(draft_json).map_err(|e| format!("Invalid draft JSON: {}", e))?;
    let unslabbed = draft.tax_breakup().unslabbed.len();
    let json = serde_json::to_string(&draft).map_err(|e| e.to_string())?;
    Ok((json, unslabbed))
}

/// Recompute `amount` and `margin` for a single line item
#[wasm_bindgen]
pub fn recalculate_line_item(item_json: &str) -> Result<String, JsValue> {
    recalculate_line_item_json(item_json).map_err(js_error)
}

/// Apply one field edit (`{"field": "...", "value": ...}`) to a line item
#[wasm_bindgen]
pub fn edit_line_item(item_json: &str, edit_json: &str) -> Result<String, JsValue> {
    edit_line_item_json(item_json, edit_json).map_err(js_error)
}

/// Value a whole draft: line amounts, tax breakup, and invoice summary
#[wasm_bindgen]
pub fn summarize_receipt(draft_json: &str) -> Result<String, JsValue> {
    let (json, unslabbed) = summarize_receipt_json(draft_json).map_err(js_error)?;
    if unslabbed > 0 {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "{} line(s) have a GST rate outside the 5/12/18/28 slabs and carry no tax",
            unslabbed
        )));
    }
    Ok(json)
}

/// Whether a combined GST rate falls in one of the four slabs
#[wasm_bindgen]
pub fn is_slab_gst_rate(combined_rate: &str) -> bool {
    Decimal::from_str(combined_rate.trim())
        .map(is_known_gst_rate)
        .unwrap_or(false)
}

/// Whether `reason` is allowed for an adjustment of the given type
#[wasm_bindgen]
pub fn is_valid_adjustment_reason(adjustment_type: &str, reason: &str) -> bool {
    validate_adjustment_reason(adjustment_type, reason).is_ok()
}
