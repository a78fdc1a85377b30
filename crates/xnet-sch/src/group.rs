//! Folding the flat pin-visit list into per-component connection records.

use std::collections::HashMap;

use serde::Serialize;

use crate::trace::PinVisit;

/// A component's attachment to one net: the set of its pins tied to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub pins: Vec<String>,
    pub net: String,
}

/// One component reached by a traversal, with its connections in canonical
/// order.
#[derive(Debug, Clone, Serialize)]
pub struct TracedComponent {
    pub refdes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dns: bool,
    pub connections: Vec<Connection>,
}

/// Fold pin visits by refdes, coalescing same-net pins into a single
/// connection. Pins within a connection are natural-sorted; connections are
/// ordered by the natural order of their first pin.
pub fn group_by_component(pins: &[PinVisit]) -> Vec<TracedComponent> {
    let mut by_refdes: HashMap<&str, usize> = HashMap::new();
    let mut components: Vec<TracedComponent> = Vec::new();

    for visit in pins {
        let idx = *by_refdes.entry(&visit.refdes).or_insert_with(|| {
            components.push(TracedComponent {
                refdes: visit.refdes.clone(),
                mpn: visit.mpn.clone(),
                description: visit.description.clone(),
                comment: visit.comment.clone(),
                value: visit.value.clone(),
                dns: visit.dns,
                connections: Vec::new(),
            });
            components.len() - 1
        });

        let component = &mut components[idx];
        match component
            .connections
            .iter_mut()
            .find(|c| c.net == visit.net)
        {
            Some(connection) => {
                if !connection.pins.contains(&visit.pin) {
                    connection.pins.push(visit.pin.clone());
                }
            }
            None => component.connections.push(Connection {
                pins: vec![visit.pin.clone()],
                net: visit.net.clone(),
            }),
        }
    }

    for component in &mut components {
        for connection in &mut component.connections {
            connection.pins.sort_by(|a, b| natord::compare(a, b));
        }
        component
            .connections
            .sort_by(|a, b| natord::compare(&a.pins[0], &b.pins[0]));
    }

    components
}
