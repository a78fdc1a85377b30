//! Net-name and component classification predicates.
//!
//! All patterns are compiled once per process; the traversal engine calls
//! these on every hop.

use std::sync::LazyLock;

use regex::Regex;

static GROUND_NET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(GND|VSS|AGND|DGND|PGND|SGND|CGND)$").expect("Invalid regex")
});

static POWER_NET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^(
            (VCC|VDD|VIN|VOUT|VBAT|VBUS|VSYS).*   # conventional rail prefixes
          | (PP|PN|LD_PP|LD_PN).*                 # PPnnn-style rail naming
          | (PWR_|RAIL_).*                        # explicit rail prefixes
          | [0-9]+(\.[0-9]+)?V[0-9]*              # voltage literals: 3V3, 12V, 1.8V
          | [+-].+                                # +5V, -12V, any signed rail
        )$",
    )
    .expect("Invalid regex")
});

static DNS_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(DNS|DNP|DNF|DNI)\b|DO\s+NOT\s+STUFF|DO\s+NOT\s+POPULATE|DO\s+NOT\s+INSTALL|NOT\s+POPULATED|NO\s+POP",
    )
    .expect("Invalid regex")
});

static VALID_REFDES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z][A-Z0-9_]*$").expect("Invalid regex"));

/// Refdes prefixes of series passives the traversal continues through.
const PASSIVE_PREFIXES: &[&str] = &["RS", "FR", "FB", "R", "L", "C"];

/// Ground rails: traversal may start adjacent to them but never crosses.
pub fn is_ground_net(name: &str) -> bool {
    GROUND_NET.is_match(name)
}

/// Power rails, by naming convention.
pub fn is_power_net(name: &str) -> bool {
    POWER_NET.is_match(name)
}

/// Nets the traversal visits but never continues through.
pub fn is_stop_net(name: &str) -> bool {
    is_ground_net(name) || is_power_net(name)
}

/// Whether a refdes names a series passive (resistor, inductor, capacitor,
/// ferrite bead, including RS/FR resistor variants).
pub fn is_passive(refdes: &str) -> bool {
    let upper = refdes.to_uppercase();
    PASSIVE_PREFIXES.iter().any(|p| upper.starts_with(p))
}

/// Whether the component's part metadata marks it as not populated.
pub fn is_dns(haystack: &str) -> bool {
    DNS_MARKER.is_match(haystack)
}

/// Reference designators are a letter followed by letters, digits or
/// underscores. Instance paths (`X1@U3.R2`, `a.b:c`) fail this test and are
/// filtered during decoding.
pub fn is_valid_refdes(s: &str) -> bool {
    VALID_REFDES.is_match(s)
}
