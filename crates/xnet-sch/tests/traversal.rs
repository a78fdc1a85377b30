//! End-to-end traversal behavior over hand-built netlists.

use xnet_sch::{trace_from_net, trace_from_pin, Netlist, TraceError, TraceOptions};

fn netlist(links: &[(&str, &str, &str)]) -> Netlist {
    let mut model = Netlist::new();
    for (net, refdes, pin) in links {
        model.link(net, refdes, pin);
    }
    model.check_symmetry().unwrap();
    model
}

fn set_mpn(model: &mut Netlist, refdes: &str, mpn: &str) {
    model.components.get_mut(refdes).unwrap().mpn = Some(mpn.to_string());
}

fn group_refdes(result: &xnet_sch::TraceResult) -> Vec<String> {
    result
        .components_by_mpn
        .iter()
        .flat_map(|g| {
            if g.refdes.is_empty() {
                g.orientations
                    .iter()
                    .flat_map(|o| o.refdes.clone())
                    .collect::<Vec<_>>()
            } else {
                g.refdes.clone()
            }
        })
        .collect()
}

#[test]
fn ground_net_query_is_refused() {
    let mut model = netlist(&[("GND", "R1", "2"), ("SIG", "R1", "1")]);
    set_mpn(&mut model, "R1", "10k");

    let err = trace_from_net(&model, "GND", &TraceOptions::default()).unwrap_err();
    assert!(matches!(err, TraceError::GroundNet(_)));
    let message = err.to_string();
    assert!(message.contains("ground net"), "got: {message}");
    assert!(message.contains("cannot be queried"), "got: {message}");
}

#[test]
fn traversal_continues_through_passives() {
    let mut model = netlist(&[
        ("A", "R1", "1"),
        ("B", "R1", "2"),
        ("B", "R2", "1"),
        ("C", "R2", "2"),
    ]);
    set_mpn(&mut model, "R1", "10k");
    set_mpn(&mut model, "R2", "20k");

    let result = trace_from_net(&model, "A", &TraceOptions::default()).unwrap();
    assert_eq!(result.total_components, 2);
    let refdes = group_refdes(&result);
    assert!(refdes.contains(&"R1".to_string()));
    assert!(refdes.contains(&"R2".to_string()));
    for net in ["A", "B", "C"] {
        assert!(result.visited_nets.contains(&net.to_string()), "missing {net}");
    }
}

#[test]
fn traversal_terminates_at_active_components() {
    let mut model = netlist(&[
        ("SIG_A", "U1", "1"),
        ("SIG_B", "U1", "2"),
        ("SIG_B", "R1", "1"),
        ("SIG_C", "R1", "2"),
    ]);
    set_mpn(&mut model, "U1", "IC");
    set_mpn(&mut model, "R1", "10k");

    let result = trace_from_net(&model, "SIG_A", &TraceOptions::default()).unwrap();
    assert_eq!(result.total_components, 1);
    assert_eq!(group_refdes(&result), vec!["U1"]);
    assert_eq!(result.visited_nets, vec!["SIG_A"]);
}

#[test]
fn traversal_stops_at_power_rail() {
    // R1 bridges SIG to +3V3; U2 regulates the rail; R9 continues from the
    // rail to FAR where U5 sits. Nothing past the rail may be explored.
    let mut model = netlist(&[
        ("SIG", "R1", "1"),
        ("+3V3", "R1", "2"),
        ("+3V3", "U2", "3"),
        ("+3V3", "R9", "1"),
        ("FAR", "R9", "2"),
        ("FAR", "U5", "1"),
    ]);
    set_mpn(&mut model, "R1", "10k");
    set_mpn(&mut model, "U2", "LDO");
    set_mpn(&mut model, "R9", "0R");
    set_mpn(&mut model, "U5", "IC");

    let result = trace_from_net(&model, "SIG", &TraceOptions::default()).unwrap();
    assert!(result.visited_nets.contains(&"+3V3".to_string()));
    assert!(!result.visited_nets.contains(&"FAR".to_string()));

    let refdes = group_refdes(&result);
    assert!(refdes.contains(&"U2".to_string()), "rail-attached active reported");
    assert!(!refdes.contains(&"U5".to_string()), "nothing beyond the rail");
    assert_eq!(result.total_components, 2); // R1 and U2
}

#[test]
fn nc_pin_query_returns_empty_result() {
    let mut model = netlist(&[("", "U1", "7"), ("SIG", "U1", "1"), ("SIG", "R1", "1")]);
    set_mpn(&mut model, "U1", "IC");

    let result = trace_from_pin(&model, "U1.7", &TraceOptions::default()).unwrap();
    assert_eq!(result.starting_point, "U1.7");
    assert_eq!(result.net.as_deref(), Some("NC"));
    assert_eq!(result.total_components, 0);
    assert_eq!(result.circuit_hash, "nc-U1.7");
    assert!(result.visited_nets.is_empty());
}

#[test]
fn pin_queries_resolve_case_insensitively() {
    let mut model = netlist(&[("", "U1", "7")]);
    set_mpn(&mut model, "U1", "IC");

    let result = trace_from_pin(&model, "u1.7", &TraceOptions::default()).unwrap();
    assert_eq!(result.starting_point, "U1.7");
    assert_eq!(result.circuit_hash, "nc-U1.7");
}

#[test]
fn fingerprint_is_independent_of_starting_point() {
    let mut model = netlist(&[
        ("A", "R1", "1"),
        ("B", "R1", "2"),
        ("B", "R2", "1"),
        ("C", "R2", "2"),
    ]);
    set_mpn(&mut model, "R1", "10k");
    set_mpn(&mut model, "R2", "20k");

    let from_a = trace_from_net(&model, "A", &TraceOptions::default()).unwrap();
    let from_c = trace_from_net(&model, "C", &TraceOptions::default()).unwrap();
    assert_eq!(from_a.circuit_hash, from_c.circuit_hash);
    assert_eq!(from_a.total_components, from_c.total_components);
}

#[test]
fn pin_query_matches_net_query() {
    let mut model = netlist(&[
        ("A", "R1", "1"),
        ("B", "R1", "2"),
        ("B", "R2", "1"),
        ("C", "R2", "2"),
    ]);
    set_mpn(&mut model, "R1", "10k");
    set_mpn(&mut model, "R2", "20k");

    let by_pin = trace_from_pin(&model, "R1.1", &TraceOptions::default()).unwrap();
    let by_net = trace_from_net(&model, "A", &TraceOptions::default()).unwrap();

    assert_eq!(by_pin.circuit_hash, by_net.circuit_hash);
    assert_eq!(by_pin.total_components, by_net.total_components);
    assert_eq!(by_pin.visited_nets, by_net.visited_nets);
    assert_eq!(by_pin.starting_point, "R1.1");
    assert_eq!(by_pin.net.as_deref(), Some("A"));
    assert_eq!(by_net.starting_point, "A");
    assert!(by_net.net.is_none());
}

#[test]
fn unknown_entities_are_query_errors() {
    let model = netlist(&[("SIG", "R1", "1")]);
    assert!(matches!(
        trace_from_net(&model, "NOPE", &TraceOptions::default()),
        Err(TraceError::UnknownNet(_))
    ));
    assert!(matches!(
        trace_from_pin(&model, "U9.1", &TraceOptions::default()),
        Err(TraceError::UnknownComponent(_))
    ));
    assert!(matches!(
        trace_from_pin(&model, "R1.9", &TraceOptions::default()),
        Err(TraceError::UnknownPin { .. })
    ));
    assert!(matches!(
        trace_from_pin(&model, "no-dot-spec", &TraceOptions::default()),
        Err(TraceError::InvalidPinSpec(_))
    ));
}

#[test]
fn ground_pin_query_is_refused() {
    let mut model = netlist(&[("GND", "R1", "2"), ("SIG", "R1", "1")]);
    set_mpn(&mut model, "R1", "10k");
    let err = trace_from_pin(&model, "R1.2", &TraceOptions::default()).unwrap_err();
    assert!(matches!(err, TraceError::GroundNet(_)));
}

#[test]
fn skip_types_filter_components_and_count() {
    let mut model = netlist(&[
        ("SIG", "R1", "1"),
        ("SIG", "TP1", "1"),
        ("SIG", "TP2", "1"),
        ("END", "R1", "2"),
    ]);
    set_mpn(&mut model, "R1", "10k");

    let opts = TraceOptions {
        skip_types: vec!["TP".to_string()],
        include_dns: false,
    };
    let result = trace_from_net(&model, "SIG", &opts).unwrap();
    let refdes = group_refdes(&result);
    assert!(!refdes.iter().any(|r| r.starts_with("TP")));
    assert_eq!(result.skipped.get("TP"), Some(&2));
}

#[test]
fn dns_components_are_filtered_unless_included() {
    let mut model = netlist(&[
        ("SIG", "R1", "1"),
        ("END", "R1", "2"),
        ("SIG", "U3", "4"),
    ]);
    set_mpn(&mut model, "R1", "10k");
    let u3 = model.components.get_mut("U3").unwrap();
    u3.mpn = Some("IC".to_string());
    u3.description = Some("buffer DNP".to_string());

    let result = trace_from_net(&model, "SIG", &TraceOptions::default()).unwrap();
    assert!(!group_refdes(&result).contains(&"U3".to_string()));

    let opts = TraceOptions {
        skip_types: Vec::new(),
        include_dns: true,
    };
    let with_dns = trace_from_net(&model, "SIG", &opts).unwrap();
    assert!(group_refdes(&with_dns).contains(&"U3".to_string()));
    let dns_group = with_dns
        .components_by_mpn
        .iter()
        .find(|g| g.refdes.contains(&"U3".to_string()))
        .unwrap();
    assert!(dns_group.dns);
}

#[test]
fn repeated_queries_serialize_identically() {
    let mut model = netlist(&[
        ("A", "R1", "1"),
        ("B", "R1", "2"),
        ("B", "U1", "5"),
    ]);
    set_mpn(&mut model, "R1", "10k");
    set_mpn(&mut model, "U1", "IC");

    let first = trace_from_net(&model, "A", &TraceOptions::default()).unwrap();
    let second = trace_from_net(&model, "A", &TraceOptions::default()).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
