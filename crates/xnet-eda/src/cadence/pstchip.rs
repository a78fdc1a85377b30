//! `pstchip.dat` parser: chip (primitive) definitions with their pin
//! name → number maps and body properties.

use std::collections::HashMap;

/// One `primitive` section.
#[derive(Debug, Clone, Default)]
pub struct ChipPart {
    pub part_name: String,
    /// Logical pin name → pin number, in declaration order.
    pub pins: Vec<(String, String)>,
    /// `body` block properties (`VALUE`, `PART_NAME`, ...).
    pub body: HashMap<String, String>,
}

impl ChipPart {
    /// Logical name of a pin number, if the chip declares one.
    pub fn pin_name(&self, number: &str) -> Option<&str> {
        self.pins
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(number))
            .map(|(name, _)| name.as_str())
    }
}

pub fn parse(text: &str) -> Vec<ChipPart> {
    let mut parts: Vec<ChipPart> = Vec::new();
    let mut in_pin = false;
    let mut in_body = false;
    let mut pending_pin: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("primitive") {
            parts.push(ChipPart {
                part_name: unquote(rest).to_string(),
                ..Default::default()
            });
            in_pin = false;
            in_body = false;
            pending_pin = None;
            continue;
        }
        let Some(part) = parts.last_mut() else {
            continue;
        };

        match line.trim_end_matches(';') {
            "pin" => {
                in_pin = true;
                continue;
            }
            "end_pin" => {
                in_pin = false;
                pending_pin = None;
                continue;
            }
            "body" => {
                in_body = true;
                continue;
            }
            "end_body" => {
                in_body = false;
                continue;
            }
            "end_primitive" => {
                in_pin = false;
                in_body = false;
                continue;
            }
            _ => {}
        }

        if in_pin {
            if let Some(number) = line
                .strip_prefix("PIN_NUMBER")
                .and_then(|rest| rest.trim().strip_prefix('='))
            {
                if let Some(name) = pending_pin.take() {
                    part.pins.push((name, pin_number(number)));
                }
            } else if line.starts_with('\'') && line.ends_with(':') {
                pending_pin = Some(unquote(line).to_string());
            }
            continue;
        }

        if in_body {
            if let Some((key, value)) = line.split_once('=') {
                part.body.insert(
                    key.trim().to_string(),
                    value
                        .trim()
                        .trim_end_matches([';', ','])
                        .trim_matches('\'')
                        .to_string(),
                );
            }
        }
    }

    parts
}

/// `'(<n>)';` → `<n>`. Multi-section declarations keep their first slot.
fn pin_number(raw: &str) -> String {
    let inner = raw
        .trim()
        .trim_end_matches(';')
        .trim_matches('\'')
        .trim_matches(['(', ')']);
    inner.split(',').next().unwrap_or(inner).trim().to_string()
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    let Some(start) = text.find('\'') else {
        return text;
    };
    let rest = &text[start + 1..];
    match rest.find('\'') {
        Some(end) => &rest[..end],
        None => rest,
    }
}
