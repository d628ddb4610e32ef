//! Control harvesting — one injected query pass over the live form.
//!
//! The harvest script stamps every control with a namespaced `data-fp-idx`
//! attribute and returns a JSON descriptor per control (tag, type, hint text,
//! current value, select options, radio question context). Fields are then
//! processed in document order from this single snapshot; controls mounted
//! mid-pass are only seen by the next pass or the mutation watcher.

use serde::Deserialize;

/// Descriptor of one form control as seen at snapshot time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlSnapshot {
    /// Value of the stamped `data-fp-idx` attribute, e.g. `"g2:14"`.
    pub sel: String,
    pub tag: String,
    /// Lowercased `type` attribute for inputs, empty otherwise.
    #[serde(default)]
    pub kind: String,
    /// Raw label/placeholder/ARIA hint text (not yet lowercased).
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub haspopup: String,
    /// Option texts for native selects, in option order.
    #[serde(default)]
    pub options: Vec<String>,
    /// Recovered question context for radios, empty otherwise.
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Checkbox,
    Radio,
    Date,
    Email,
    Tel,
    Text,
    TextArea,
    Select,
    Combobox,
}

impl ControlSnapshot {
    pub fn hint_lower(&self) -> String {
        self.hint.trim().to_lowercase()
    }

    pub fn classify(&self) -> ControlKind {
        if self.role == "combobox" || self.haspopup == "listbox" {
            return ControlKind::Combobox;
        }
        match self.tag.as_str() {
            "select" => ControlKind::Select,
            "textarea" => ControlKind::TextArea,
            _ => match self.kind.as_str() {
                "checkbox" => ControlKind::Checkbox,
                "radio" => ControlKind::Radio,
                "date" => ControlKind::Date,
                "email" => ControlKind::Email,
                "tel" => ControlKind::Tel,
                _ => ControlKind::Text,
            },
        }
    }
}

const HARVEST_TEMPLATE: &str = r#"
(() => {
    const ns = __NS__;
    const rootSel = __ROOT__;
    const root = rootSel ? document.querySelector(rootSel) : document;
    if (!root) return [];

    const textOf = (el) => (el && el.textContent ? el.textContent.trim() : "");

    const hintFor = (el) => {
        if (el.id) {
            const l = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
            if (l && textOf(l)) return textOf(l);
        }
        const lb = el.getAttribute('aria-labelledby');
        if (lb) {
            const node = document.getElementById(lb.split(' ')[0]);
            if (node && textOf(node)) return textOf(node);
        }
        let cur = el.parentElement;
        for (let i = 0; i < 3 && cur; i++) {
            const lab = cur.querySelector('label, [data-automation-id="textInputBox"]');
            if (lab && lab !== el && textOf(lab)) return textOf(lab);
            cur = cur.parentElement;
        }
        return el.getAttribute('placeholder') || el.getAttribute('aria-label') || '';
    };

    const questionFor = (el) => {
        const fs = el.closest('fieldset');
        if (fs) {
            const t = textOf(fs.querySelector('legend'));
            if (t && t.length > 5) return t;
        }
        let cur = el.parentElement;
        for (let i = 0; i < 5 && cur; i++) {
            const q = cur.querySelector("h1, h2, h3, h4, h5, h6, [role='heading'], [data-automation-id*='question']");
            const t = textOf(q);
            if (t && t.length > 5 && !/^(yes|no|y|n)$/i.test(t)) return t;
            cur = cur.parentElement;
        }
        const desc = el.getAttribute('aria-describedby');
        if (desc) {
            const t = textOf(document.getElementById(desc.split(' ')[0]));
            if (t && t.length > 5) return t;
        }
        return '';
    };

    const els = Array.from(new Set([
        ...root.querySelectorAll('input, textarea, select, [role="combobox"], [aria-haspopup="listbox"]')
    ]));

    return els.map((el, i) => {
        const sel = ns + ':' + i;
        el.setAttribute('data-fp-idx', sel);
        const tag = el.tagName.toLowerCase();
        const kind = (el.getAttribute('type') || '').toLowerCase();
        const d = {
            sel: sel,
            tag: tag,
            kind: kind,
            hint: (hintFor(el) || '').trim(),
            value: ('value' in el && el.value != null) ? String(el.value) : '',
            checked: el.checked === true,
            required: el.required === true || el.getAttribute('aria-required') === 'true',
            role: el.getAttribute('role') || '',
            haspopup: el.getAttribute('aria-haspopup') || '',
            options: [],
            question: ''
        };
        if (tag === 'select') d.options = Array.from(el.options).map(o => textOf(o));
        if (kind === 'radio') d.question = questionFor(el);
        return d;
    });
})()
"#;

/// Build the harvest script for a namespace, optionally scoped to a section
/// root selector instead of the whole document.
pub fn harvest_script(ns: &str, root_selector: Option<&str>) -> String {
    let ns_json = serde_json::to_string(ns).expect("namespace serializes");
    let root_json = match root_selector {
        Some(sel) => serde_json::to_string(sel).expect("selector serializes"),
        None => "null".to_string(),
    };
    HARVEST_TEMPLATE
        .replace("__NS__", &ns_json)
        .replace("__ROOT__", &root_json)
}

/// Decode a harvest result. Malformed descriptors are dropped rather than
/// failing the pass.
pub fn parse_harvest(value: serde_json::Value) -> Vec<ControlSnapshot> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_dispatches_on_tag_type_and_aria() {
        let mk = |tag: &str, kind: &str, role: &str, haspopup: &str| ControlSnapshot {
            tag: tag.into(),
            kind: kind.into(),
            role: role.into(),
            haspopup: haspopup.into(),
            ..Default::default()
        };
        assert_eq!(mk("input", "checkbox", "", "").classify(), ControlKind::Checkbox);
        assert_eq!(mk("input", "radio", "", "").classify(), ControlKind::Radio);
        assert_eq!(mk("input", "text", "", "").classify(), ControlKind::Text);
        assert_eq!(mk("input", "", "", "").classify(), ControlKind::Text);
        assert_eq!(mk("select", "", "", "").classify(), ControlKind::Select);
        assert_eq!(mk("textarea", "", "", "").classify(), ControlKind::TextArea);
        // ARIA wins over the underlying tag.
        assert_eq!(mk("input", "text", "combobox", "").classify(), ControlKind::Combobox);
        assert_eq!(mk("div", "", "", "listbox").classify(), ControlKind::Combobox);
    }

    #[test]
    fn parse_harvest_drops_malformed_entries() {
        let raw = json!([
            {"sel": "g0:0", "tag": "input", "kind": "text", "hint": "First Name"},
            42,
            {"sel": "g0:1", "tag": "select", "options": ["United States", "Canada"]}
        ]);
        let controls = parse_harvest(raw);
        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0].hint, "First Name");
        assert_eq!(controls[1].options.len(), 2);
    }

    #[test]
    fn harvest_script_splices_namespace_and_scope() {
        let s = harvest_script("g3", Some("[data-fp-section=\"work-0\"]"));
        assert!(s.contains("\"g3\""));
        assert!(s.contains("data-fp-section"));
        let unscoped = harvest_script("g4", None);
        assert!(unscoped.contains("const rootSel = null;"));
    }
}
