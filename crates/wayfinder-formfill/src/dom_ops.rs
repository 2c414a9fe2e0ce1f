//! Builds the small `evaluate_script` snippets the filler round-trips
//! through the page, and the generic (never site-specific) CSS selector a
//! [`FieldDescriptor`] resolves to.

use wayfinder_types::model::FieldDescriptor;

/// `#id` takes priority over `[name=...]` since ids are unique; falls back to
/// `None` when PageContext captured neither (the filler then has to fall
/// back to a label-text match, handled by the caller).
pub fn field_selector(field: &FieldDescriptor) -> Option<String> {
    if let Some(id) = &field.id {
        if !id.is_empty() {
            return Some(format!("#{}", css_escape(id)));
        }
    }
    if let Some(name) = &field.name {
        if !name.is_empty() {
            return Some(format!("[name={}]", json_string(name)));
        }
    }
    None
}

fn css_escape(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c.to_string() } else { format!("\\{c}") })
        .collect()
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Tier (a): the high-level fill primitive — set `.value` through the
/// property setter and dispatch `input`/`change`/`blur` so any attached
/// framework listener sees the change.
pub fn fill_primitive_js(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return {{ status: 'not-found' }};
    el.focus();
    el.value = {value};
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    el.dispatchEvent(new Event('blur', {{ bubbles: true }}));
    return {{ status: 'ok' }};
}})()"#,
        selector = json_string(selector),
        value = json_string(value)
    )
}

/// Tier (c): direct assignment via the element prototype's native value
/// setter. Needed on React/Vue-controlled inputs, whose own setter
/// overrides a plain `el.value =` assignment and swallows it silently.
pub fn fill_native_setter_js(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return {{ status: 'not-found' }};
    const proto = el.tagName === 'TEXTAREA' ? window.HTMLTextAreaElement.prototype : window.HTMLInputElement.prototype;
    const setter = Object.getOwnPropertyDescriptor(proto, 'value') && Object.getOwnPropertyDescriptor(proto, 'value').set;
    if (setter) {{
        setter.call(el, {value});
    }} else {{
        el.value = {value};
    }}
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    el.dispatchEvent(new Event('blur', {{ bubbles: true }}));
    return {{ status: 'ok' }};
}})()"#,
        selector = json_string(selector),
        value = json_string(value)
    )
}

/// Collects the generic validation markers for one field after a fill
/// attempt: `aria-invalid`, its class list, and the nearest sibling/parent
/// text node (for "this field is required"-style messages).
pub fn validation_markers_js(selector: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return {{ ariaInvalid: false, classList: [], adjacentText: null }};
    const ariaInvalid = el.getAttribute('aria-invalid') === 'true';
    const classList = el.className && typeof el.className === 'string' ? el.className.trim().split(/\s+/) : [];
    let adjacentText = null;
    const parent = el.closest('label, .form-group, .field, div') || el.parentElement;
    if (parent) {{
        adjacentText = (parent.innerText || '').trim().slice(0, 200);
    }}
    return {{ ariaInvalid, classList, adjacentText }};
}})()"#,
        selector = json_string(selector)
    )
}

/// Enumerates checkboxes on the page for step 6's consent search.
pub fn consent_checkboxes_js() -> &'static str {
    r#"(() => {
    const boxes = Array.from(document.querySelectorAll('input[type="checkbox"]'));
    return boxes.map((box, i) => {
        let labelText = null;
        if (box.labels && box.labels.length > 0) {
            labelText = box.labels[0].innerText.trim();
        } else if (box.closest('label')) {
            labelText = box.closest('label').innerText.trim();
        }
        const selector = box.id ? ('#' + CSS.escape(box.id)) : null;
        return {
            required: box.required,
            labelText,
            selector: selector || ('input[type="checkbox"]:nth-of-type(' + (i + 1) + ')'),
        };
    });
})()"#
}

/// Clicks a checkbox (used both for consent and, in principle, any bare
/// checkbox field the filler is asked to tick).
pub fn click_checkbox_js(selector: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return {{ status: 'not-found' }};
    if (!el.checked) {{
        el.click();
    }}
    return {{ status: 'ok', checked: el.checked }};
}})()"#,
        selector = json_string(selector)
    )
}

/// Finds a submit control: prefers `button[type=submit]` inside the target
/// form, falls back to any visible button/input whose label reads like a
/// generic submit verb (checked in Rust via [`crate::submit::is_submit_label`]
/// so the matching logic isn't duplicated in JS).
pub fn candidate_submit_controls_js() -> &'static str {
    r#"(() => {
    const candidates = Array.from(
        document.querySelectorAll('button, input[type="submit"], input[type="button"]')
    );
    return candidates.map((el, i) => {
        const text = (el.innerText || el.value || '').trim();
        const isTypeSubmit = el.type === 'submit';
        const selector = el.id ? ('#' + CSS.escape(el.id)) : ('button, input[type="submit"], input[type="button"]:nth-of-type(' + (i + 1) + ')');
        return { text, isTypeSubmit, selector, index: i };
    });
})()"#
}

pub fn click_by_index_js(kind_selector: &str, index: usize) -> String {
    format!(
        r#"(() => {{
    const els = Array.from(document.querySelectorAll({kind_selector}));
    const el = els[{index}];
    if (!el) return {{ status: 'not-found' }};
    el.click();
    return {{ status: 'ok' }};
}})()"#,
        kind_selector = json_string(kind_selector),
        index = index
    )
}

pub fn page_snapshot_for_success_js(form_marker_text: &str) -> String {
    format!(
        r#"(() => {{
    const bodyText = (document.body && document.body.innerText) || '';
    return {{
        url: window.location.href,
        formStillPresent: bodyText.includes({marker}),
        bodyTextSample: bodyText.slice(0, 1000),
    }};
}})()"#,
        marker = json_string(form_marker_text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_id_selector() {
        let field = FieldDescriptor {
            id: Some("email-field".to_string()),
            name: Some("email".to_string()),
            ..Default::default()
        };
        assert_eq!(field_selector(&field).as_deref(), Some("#email-field"));
    }

    #[test]
    fn falls_back_to_name_selector() {
        let field = FieldDescriptor { name: Some("email".to_string()), ..Default::default() };
        assert_eq!(field_selector(&field).as_deref(), Some(r#"[name="email"]"#));
    }

    #[test]
    fn returns_none_without_id_or_name() {
        let field = FieldDescriptor::default();
        assert!(field_selector(&field).is_none());
    }

    #[test]
    fn fill_script_embeds_escaped_value() {
        let script = fill_primitive_js("#x", "O'Brien \"Jr\"");
        assert!(script.contains("querySelector"));
        assert!(script.contains("O'Brien"));
    }
}
