//! `pstxnet.dat` parser: net sections with their `(refdes, pin)` nodes.

/// One `NET_NAME` section.
#[derive(Debug, Clone, PartialEq)]
pub struct NetSection {
    pub name: String,
    pub nodes: Vec<(String, String)>,
}

/// Line-oriented parse. A `NET_NAME` sentinel opens a section, the next
/// non-empty quoted line names it, and `NODE_NAME` lines contribute
/// refdes/pin pairs. Sections flush on the next sentinel and at EOF.
pub fn parse(text: &str) -> Vec<NetSection> {
    let mut sections = Vec::new();
    let mut current: Option<NetSection> = None;
    let mut awaiting_name = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "NET_NAME" {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            awaiting_name = true;
            continue;
        }

        if awaiting_name {
            current = Some(NetSection {
                name: unquote(line).to_string(),
                nodes: Vec::new(),
            });
            awaiting_name = false;
            continue;
        }

        if let Some(rest) = line.strip_prefix("NODE_NAME") {
            let mut tokens = rest.split_whitespace();
            if let (Some(refdes), Some(pin)) = (tokens.next(), tokens.next()) {
                if let Some(section) = current.as_mut() {
                    section.nodes.push((refdes.to_string(), pin.to_string()));
                }
            }
        }
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }
    sections
}

/// Contents of the first single-quoted span, or the whole line when the
/// quotes are absent.
fn unquote(line: &str) -> &str {
    let Some(start) = line.find('\'') else {
        return line;
    };
    let rest = &line[start + 1..];
    match rest.find('\'') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
FILE_TYPE = EXPANDEDNETLIST;
{ Using PSTWRITER 17.4.0 }
NET_NAME
'SIG_A'
 C_SIGNAL='@design.sch(sch_1):sig_a';
NODE_NAME\tR1 1
 '@design.sch(sch_1):ins123@lib.res(chip)':'A';
NODE_NAME\tU5 22
 '@design.sch(sch_1):ins200@lib.ic(chip)':'IN';
NET_NAME
'GND'
NODE_NAME\tR1 2
NODE_NAME\tC3 2
";

    #[test]
    fn parses_sections_and_nodes() {
        let sections = parse(SAMPLE);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "SIG_A");
        assert_eq!(
            sections[0].nodes,
            vec![
                ("R1".to_string(), "1".to_string()),
                ("U5".to_string(), "22".to_string()),
            ]
        );
        assert_eq!(sections[1].name, "GND");
        assert_eq!(sections[1].nodes.len(), 2);
    }

    #[test]
    fn same_refdes_accumulates_multiple_pins() {
        let text = "NET_NAME\n'PWR'\nNODE_NAME U1 3\nNODE_NAME U1 4\n";
        let sections = parse(text);
        assert_eq!(
            sections[0].nodes,
            vec![
                ("U1".to_string(), "3".to_string()),
                ("U1".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn empty_input_yields_no_sections() {
        assert!(parse("").is_empty());
    }
}
