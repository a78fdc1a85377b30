//! XNET traversal: breadth-first exploration of the universal netlist that
//! continues through series passives and terminates at power/ground rails
//! and active devices.

use std::collections::{BTreeMap, HashSet, VecDeque};

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::aggregate::TraceResult;
use crate::classify::{is_ground_net, is_passive, is_stop_net};
use crate::{classify, Component, Netlist, NC_NET};

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("unknown net '{0}'; list the design's nets to see available names")]
    UnknownNet(String),
    #[error("unknown component '{0}'")]
    UnknownComponent(String),
    #[error("component {refdes} has no pin '{pin}'")]
    UnknownPin { refdes: String, pin: String },
    #[error("'{0}' is a ground net and cannot be queried; trace a signal net adjacent to it instead")]
    GroundNet(String),
    #[error("invalid pin spec '{0}': expected REFDES.PIN (e.g. U1.7)")]
    InvalidPinSpec(String),
}

/// Caller-facing traversal configuration.
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    /// Refdes prefixes to exclude from the result (e.g. `TP`, `J`).
    pub skip_types: Vec<String>,
    /// Report components marked do-not-stuff instead of filtering them.
    pub include_dns: bool,
}

/// One visited pin, in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinVisit {
    pub refdes: String,
    pub pin: String,
    pub net: String,
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
}

/// Raw traversal output, before grouping and aggregation.
#[derive(Debug, Default)]
pub struct Traversal {
    pub pins: Vec<PinVisit>,
    /// Nets visited, in discovery order (stop nets included).
    pub visited_nets: Vec<String>,
    /// Components skipped per configured refdes prefix.
    pub skipped: BTreeMap<String, usize>,
}

/// Trace the XNET starting from a named net.
pub fn trace_from_net(
    netlist: &Netlist,
    net: &str,
    opts: &TraceOptions,
) -> Result<TraceResult, TraceError> {
    if is_ground_net(net) {
        return Err(TraceError::GroundNet(net.to_string()));
    }
    if !netlist.nets.contains_key(net) {
        return Err(TraceError::UnknownNet(net.to_string()));
    }
    let traversal = Walker::new(netlist, opts).run(net);
    Ok(TraceResult::build(net.to_string(), None, traversal))
}

/// Trace the XNET starting from a `REFDES.PIN` spec. Resolution of both the
/// refdes and the pin is case-insensitive; the query is rejected for ground
/// pins and short-circuits to an empty result for unconnected pins.
pub fn trace_from_pin(
    netlist: &Netlist,
    spec: &str,
    opts: &TraceOptions,
) -> Result<TraceResult, TraceError> {
    let Some((refdes_raw, pin_raw)) = spec.split_once('.') else {
        return Err(TraceError::InvalidPinSpec(spec.to_string()));
    };
    let refdes = refdes_raw.trim().to_uppercase();
    let pin = pin_raw.trim().to_uppercase();
    if refdes.is_empty() || pin.is_empty() {
        return Err(TraceError::InvalidPinSpec(spec.to_string()));
    }

    let component = netlist
        .components
        .get(&refdes)
        .ok_or_else(|| TraceError::UnknownComponent(refdes.clone()))?;
    let entry = component.pins.get(&pin).ok_or_else(|| TraceError::UnknownPin {
        refdes: refdes.clone(),
        pin: pin.clone(),
    })?;

    let net = entry.net().to_string();
    if is_ground_net(&net) {
        return Err(TraceError::GroundNet(net));
    }
    let starting_point = format!("{refdes}.{pin}");
    if net == NC_NET {
        return Ok(TraceResult::empty_nc(starting_point));
    }

    let traversal = Walker::new(netlist, opts).run(&net);
    Ok(TraceResult::build(starting_point, Some(net), traversal))
}

struct Walker<'a> {
    netlist: &'a Netlist,
    opts: &'a TraceOptions,
    queue: VecDeque<String>,
    seen_nets: HashSet<String>,
    visited_nets: Vec<String>,
    visited_pins: HashSet<(String, String)>,
    skipped_refdes: HashSet<String>,
    skipped: BTreeMap<String, usize>,
    pins: Vec<PinVisit>,
}

impl<'a> Walker<'a> {
    fn new(netlist: &'a Netlist, opts: &'a TraceOptions) -> Self {
        Walker {
            netlist,
            opts,
            queue: VecDeque::new(),
            seen_nets: HashSet::new(),
            visited_nets: Vec::new(),
            visited_pins: HashSet::new(),
            skipped_refdes: HashSet::new(),
            skipped: BTreeMap::new(),
            pins: Vec::new(),
        }
    }

    fn run(mut self, start: &str) -> Traversal {
        self.mark_net(start);
        self.queue.push_back(start.to_string());

        while let Some(net) = self.queue.pop_front() {
            let netlist = self.netlist;
            let Some(members) = netlist.nets.get(&net) else {
                continue;
            };
            for (refdes, pins_on_net) in members {
                if self.try_skip(refdes) {
                    continue;
                }
                let component = netlist.components.get(refdes);
                let dns = component.is_some_and(component_is_dns);
                if dns && !self.opts.include_dns {
                    continue;
                }

                for pin in pins_on_net {
                    self.emit(refdes, pin, &net, component, dns);
                }

                if !is_passive(refdes) {
                    continue;
                }
                let Some(component) = component else {
                    continue;
                };

                // A passive carries the signal onward through its other pins.
                for (other_pin, entry) in &component.pins {
                    if self
                        .visited_pins
                        .contains(&(refdes.clone(), other_pin.clone()))
                    {
                        continue;
                    }
                    let next_net = entry.net().to_string();
                    self.emit(refdes, other_pin, &next_net, Some(component), dns);

                    if next_net == NC_NET || self.seen_nets.contains(&next_net) {
                        continue;
                    }
                    self.mark_net(&next_net);

                    let passive_follow = self.inspect(&next_net, refdes);
                    if passive_follow && !is_stop_net(&next_net) {
                        debug!("following {next_net} via {refdes}");
                        self.queue.push_back(next_net);
                    }
                }
            }
        }

        Traversal {
            pins: self.pins,
            visited_nets: self.visited_nets,
            skipped: self.skipped,
        }
    }

    /// Look at the far end of a net reached through a passive. Active pins
    /// are reported immediately (they terminate the signal there); passives
    /// make the net worth enqueuing.
    fn inspect(&mut self, net: &str, via_refdes: &str) -> bool {
        let netlist = self.netlist;
        let Some(members) = netlist.nets.get(net) else {
            return false;
        };
        let mut passive_follow = false;
        for (refdes, pins_on_net) in members {
            if refdes == via_refdes {
                continue;
            }
            if self.try_skip(refdes) {
                continue;
            }
            let component = netlist.components.get(refdes);
            let dns = component.is_some_and(component_is_dns);
            if dns && !self.opts.include_dns {
                continue;
            }
            if is_passive(refdes) {
                passive_follow = true;
            } else {
                for pin in pins_on_net {
                    self.emit(refdes, pin, net, component, dns);
                }
            }
        }
        passive_follow
    }

    fn emit(
        &mut self,
        refdes: &str,
        pin: &str,
        net: &str,
        component: Option<&Component>,
        dns: bool,
    ) {
        if !self
            .visited_pins
            .insert((refdes.to_string(), pin.to_string()))
        {
            return;
        }
        self.pins.push(PinVisit {
            refdes: refdes.to_string(),
            pin: pin.to_string(),
            net: net.to_string(),
            mpn: component.and_then(|c| c.mpn.clone()),
            description: component.and_then(|c| c.description.clone()),
            comment: component.and_then(|c| c.comment.clone()),
            value: component.and_then(|c| c.value.clone()),
            dns,
        });
    }

    fn mark_net(&mut self, net: &str) {
        if self.seen_nets.insert(net.to_string()) {
            self.visited_nets.push(net.to_string());
        }
    }

    /// True when the component is excluded by a `skip_types` prefix. Each
    /// skipped refdes bumps its prefix counter once.
    fn try_skip(&mut self, refdes: &str) -> bool {
        let upper = refdes.to_uppercase();
        let Some(prefix) = self
            .opts
            .skip_types
            .iter()
            .find(|p| upper.starts_with(&p.to_uppercase()))
        else {
            return false;
        };
        if self.skipped_refdes.insert(upper) {
            *self.skipped.entry(prefix.to_uppercase()).or_insert(0) += 1;
        }
        true
    }
}

fn component_is_dns(component: &Component) -> bool {
    let haystack = [
        component.mpn.as_deref().unwrap_or(""),
        component.description.as_deref().unwrap_or(""),
        component.comment.as_deref().unwrap_or(""),
    ]
    .join(" ");
    classify::is_dns(&haystack)
}
