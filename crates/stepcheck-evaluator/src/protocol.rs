//! Page scripts used to discover and drive a component's controls.

use serde::Deserialize;
use serde_json::Value;

pub(crate) const DISCOVER_SLIDERS: &str = r#"Array.from(document.querySelectorAll('input[type="range"]')).map((s, i) => ({
    index: i,
    min: parseFloat(s.min) || 0,
    max: parseFloat(s.max) || 100,
    value: parseFloat(s.value) || 0
}))"#;

pub(crate) const DISCOVER_INPUTS: &str = r#"Array.from(document.querySelectorAll('input[type="text"], input[type="number"]')).map((inp, i) => ({
    index: i,
    type: inp.type
}))"#;

pub(crate) const DISCOVER_BUTTONS: &str = r#"Array.from(document.querySelectorAll('button')).map((btn, i) => ({
    index: i,
    text: btn.textContent.trim().substring(0, 30)
}))"#;

pub(crate) const BUTTON_TEXT_LIMIT: usize = 30;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SliderInfo {
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_slider_max")]
    pub max: f64,
}

fn default_slider_max() -> f64 {
    100.0
}

impl SliderInfo {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InputInfo {
    #[serde(rename = "type", default)]
    pub input_type: String,
}

impl InputInfo {
    /// Value typed into the field.
    pub fn sample_value(&self) -> &'static str {
        if self.input_type == "number" { "5" } else { "test" }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ButtonInfo {
    #[serde(default)]
    pub text: String,
}

impl ButtonInfo {
    pub fn label(&self) -> String {
        self.text.trim().chars().take(BUTTON_TEXT_LIMIT).collect()
    }
}

/// Decode a discovery result. Anything that is not a list of the expected
/// shape counts as "no controls".
pub(crate) fn decode_list<T: for<'de> Deserialize<'de>>(value: Value) -> Vec<T> {
    serde_json::from_value(value).unwrap_or_default()
}

pub(crate) fn set_slider_script(index: usize, value: f64) -> String {
    format!(
        r#"(function() {{
    const s = document.querySelectorAll('input[type="range"]')[{index}];
    if (s) {{
        s.value = {value};
        s.dispatchEvent(new Event('input', {{ bubbles: true }}));
        s.dispatchEvent(new Event('change', {{ bubbles: true }}));
    }}
}})()"#
    )
}

pub(crate) fn fill_input_script(index: usize, value: &str) -> String {
    format!(
        r#"(function() {{
    const inp = document.querySelectorAll('input[type="text"], input[type="number"]')[{index}];
    if (inp) {{
        inp.value = '{value}';
        inp.dispatchEvent(new Event('input', {{ bubbles: true }}));
        inp.dispatchEvent(new Event('change', {{ bubbles: true }}));
    }}
}})()"#
    )
}

pub(crate) fn click_button_script(index: usize) -> String {
    format!(
        r#"(function() {{
    const btn = document.querySelectorAll('button')[{index}];
    if (btn) btn.click();
}})()"#
    )
}
