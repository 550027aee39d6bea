//! `{{fieldName}}` placeholder resolution for sequence messages.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Campaign, Lead};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Replaces every `{{key}}` with `values[key]`. Unknown keys and unbalanced
/// braces are copied through unchanged.
pub fn resolve_template(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(OPEN) {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + OPEN.len()..];
        let Some(close) = after_open.find(CLOSE) else {
            out.push_str(&rest[open..]);
            return out;
        };

        let inner = &after_open[..close];
        if let Some(nested) = inner.rfind(OPEN) {
            // retry from the innermost opener
            out.push_str(&rest[open..open + OPEN.len() + nested]);
            rest = &after_open[nested..];
            continue;
        }

        let token_end = open + OPEN.len() + close + CLOSE.len();
        match values.get(inner.trim()) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[open..token_end]),
        }
        rest = &rest[token_end..];
    }

    out.push_str(rest);
    out
}

/// Distinct placeholder keys in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find(OPEN) {
        let after_open = &rest[open + OPEN.len()..];
        let Some(close) = after_open.find(CLOSE) else {
            break;
        };
        let inner = &after_open[..close];
        if let Some(nested) = inner.rfind(OPEN) {
            rest = &after_open[nested..];
            continue;
        }
        let key = inner.trim();
        if !key.is_empty() && !keys.iter().any(|existing| existing == key) {
            keys.push(key.to_string());
        }
        rest = &after_open[close + CLOSE.len()..];
    }

    keys
}

/// Personalization values available for a lead. Optional columns that are
/// unset are left out so their placeholders stay visible.
pub fn lead_field_values(lead: &Lead) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let full_name = lead.name.trim();
    let (first, last) = match full_name.split_once(char::is_whitespace) {
        Some((first, last)) => (first, last.trim()),
        None => (full_name, ""),
    };

    values.insert("name".to_string(), full_name.to_string());
    values.insert("firstName".to_string(), first.to_string());
    if !last.is_empty() {
        values.insert("lastName".to_string(), last.to_string());
    }
    values.insert("email".to_string(), lead.email.clone());
    if let Some(company) = lead.company.as_ref() {
        values.insert("company".to_string(), company.clone());
    }
    if let Some(position) = lead.position.as_ref() {
        values.insert("position".to_string(), position.clone());
    }
    values
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequencePreview {
    pub request_message: Option<String>,
    pub connection_message: Option<String>,
    pub first_follow_up_message: Option<String>,
    pub second_follow_up_message: Option<String>,
    pub unresolved: Vec<String>,
}

/// Resolves every template of a campaign and lists the placeholders that had
/// no value.
pub fn preview_sequence(campaign: &Campaign, values: &HashMap<String, String>) -> SequencePreview {
    let templates = [
        campaign.request_message_template.as_deref(),
        campaign.connection_message_template.as_deref(),
        campaign.first_follow_up_message_template.as_deref(),
        campaign.second_follow_up_message_template.as_deref(),
    ];

    let mut unresolved: Vec<String> = Vec::new();
    for key in templates.iter().flatten().flat_map(|t| placeholders(t)) {
        if !values.contains_key(&key) && !unresolved.contains(&key) {
            unresolved.push(key);
        }
    }

    let [request, connection, first, second] =
        templates.map(|template| template.map(|t| resolve_template(t, values)));

    SequencePreview {
        request_message: request,
        connection_message: connection,
        first_follow_up_message: first,
        second_follow_up_message: second,
        unresolved,
    }
}
