//! End-to-end Altium decoding: synthetic record streams, packed into real
//! compound-file containers, through to the universal model and a trace.

use std::path::Path;

use xnet_eda::altium::{decode_file_header, parse_project, parse_schdoc};
use xnet_sch::{trace_from_net, PinEntry, TraceOptions};

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

/// Lay records out the way Altium writers do: a length prefix and pipe
/// before the first record, null + length prefix + pipe between records,
/// and a null terminator at the end.
fn record_stream_bytes(records: &[String]) -> Vec<u8> {
    let mut out = vec![0u8; 4];
    out.push(b'|');
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push(0);
            out.extend([0u8; 4]);
            out.push(b'|');
        }
        out.extend(record.as_bytes());
    }
    out.push(0);
    out
}

/// Minimal v3 compound file holding `stream` as its `FileHeader`. The
/// mini-stream cutoff is zeroed so the stream always lives in regular
/// sectors.
fn schdoc_container(stream: &[u8]) -> Vec<u8> {
    const SECTOR: usize = 512;
    const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
    const FREESECT: u32 = 0xFFFF_FFFF;
    const FATSECT: u32 = 0xFFFF_FFFD;

    fn put_u16(buf: &mut [u8], off: usize, v: u16) {
        buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
    }
    fn put_u32(buf: &mut [u8], off: usize, v: u32) {
        buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
    }
    fn put_u64(buf: &mut [u8], off: usize, v: u64) {
        buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
    }
    fn dir_entry(name: &str, entry_type: u8, start: u32, size: u64) -> [u8; 128] {
        let mut e = [0u8; 128];
        let units: Vec<u16> = name.encode_utf16().collect();
        for (i, u) in units.iter().enumerate() {
            put_u16(&mut e, i * 2, *u);
        }
        put_u16(&mut e, 64, (units.len() as u16 + 1) * 2);
        e[66] = entry_type;
        e[67] = 1;
        put_u32(&mut e, 68, FREESECT);
        put_u32(&mut e, 72, FREESECT);
        put_u32(&mut e, 76, FREESECT);
        put_u32(&mut e, 116, start);
        put_u64(&mut e, 120, size);
        e
    }

    let data_sectors = stream.len().div_ceil(SECTOR).max(1);

    let mut header = [0u8; SECTOR];
    header[..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    put_u16(&mut header, 26, 3); // major version
    put_u16(&mut header, 28, 0xFFFE); // byte order
    put_u16(&mut header, 30, 9); // 512-byte sectors
    put_u16(&mut header, 32, 6); // 64-byte mini sectors
    put_u32(&mut header, 44, 1); // one FAT sector
    put_u32(&mut header, 48, 1); // directory at sector 1
    put_u32(&mut header, 56, 0); // mini cutoff 0: no mini stream
    put_u32(&mut header, 60, ENDOFCHAIN);
    put_u32(&mut header, 68, ENDOFCHAIN);
    put_u32(&mut header, 76, 0); // DIFAT[0] -> FAT at sector 0
    for i in 1..109 {
        put_u32(&mut header, 76 + i * 4, FREESECT);
    }

    let mut fat = [0u8; SECTOR];
    put_u32(&mut fat, 0, FATSECT);
    put_u32(&mut fat, 4, ENDOFCHAIN); // directory
    for i in 0..data_sectors {
        let next = if i + 1 == data_sectors {
            ENDOFCHAIN
        } else {
            2 + i as u32 + 1
        };
        put_u32(&mut fat, (2 + i) * 4, next);
    }
    for i in 2 + data_sectors..SECTOR / 4 {
        put_u32(&mut fat, i * 4, FREESECT);
    }

    let mut dir = [0u8; SECTOR];
    dir[..128].copy_from_slice(&dir_entry("Root Entry", 5, ENDOFCHAIN, 0));
    dir[128..256].copy_from_slice(&dir_entry("FileHeader", 2, 2, stream.len() as u64));

    let mut file = Vec::new();
    file.extend_from_slice(&header);
    file.extend_from_slice(&fat);
    file.extend_from_slice(&dir);
    let mut padded = stream.to_vec();
    padded.resize(data_sectors * SECTOR, 0);
    file.extend_from_slice(&padded);
    file
}

fn s(text: &str) -> String {
    text.to_string()
}

/// A resistor divider corner: R1.1 wired to a +3V3 power port, R1.2 meeting
/// U1.3 (logical name VIN) under a SIG net label, and a floating U1.7.
fn demo_records() -> Vec<String> {
    vec![
        s("HEADER=Protel for Windows - Schematic Capture Binary File Version 5.0|WEIGHT=6"),
        s("RECORD=1|LIBREFERENCE=RES|CURRENTPARTID=1|OWNERPARTID=-1"),
        s("RECORD=34|OWNERINDEX=0|TEXT=R1"),
        s("RECORD=41|OWNERINDEX=0|NAME=Manufacturer Part Number|TEXT=RC0402FR-0710KL"),
        s("RECORD=41|OWNERINDEX=0|NAME=Value|TEXT=10k"),
        s("RECORD=41|OWNERINDEX=0|NAME=Comment|TEXT==Value"),
        s("RECORD=2|OWNERINDEX=0|OWNERPARTID=1|DESIGNATOR=1|NAME=1|LOCATION.X=10|LOCATION.Y=10|PINLENGTH=1|PINCONGLOMERATE=0"),
        s("RECORD=2|OWNERINDEX=0|OWNERPARTID=1|DESIGNATOR=2|NAME=2|LOCATION.X=8|LOCATION.Y=10|PINLENGTH=1|PINCONGLOMERATE=2"),
        s("RECORD=1|LIBREFERENCE=LM317|CURRENTPARTID=1|OWNERPARTID=-1"),
        s("RECORD=34|OWNERINDEX=7|TEXT=U1"),
        s("RECORD=41|OWNERINDEX=7|NAME=Manufacturer Part Number|TEXT=LM317"),
        s("RECORD=2|OWNERINDEX=7|OWNERPARTID=1|DESIGNATOR=3|NAME=VIN|LOCATION.X=7|LOCATION.Y=12|PINLENGTH=2|PINCONGLOMERATE=3"),
        s("RECORD=25|LOCATION.X=7|LOCATION.Y=10|TEXT=SIG"),
        s("RECORD=27|LOCATIONCOUNT=2|X1=11|Y1=10|X2=12|Y2=10"),
        s("RECORD=17|LOCATION.X=12|LOCATION.Y=10|TEXT=+3V3"),
        s("RECORD=2|OWNERINDEX=7|OWNERPARTID=1|DESIGNATOR=7|NAME=7|LOCATION.X=30|LOCATION.Y=30|PINLENGTH=1|PINCONGLOMERATE=0"),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn decodes_demo_schematic() {
    let netlist = decode_file_header(&record_stream_bytes(&demo_records())).unwrap();
    netlist.check_symmetry().unwrap();

    assert_eq!(netlist.nets["SIG"]["R1"], vec!["2"]);
    assert_eq!(netlist.nets["SIG"]["U1"], vec!["3"]);
    assert_eq!(netlist.nets["+3V3"]["R1"], vec!["1"]);
    assert_eq!(netlist.nets["NC"]["U1"], vec!["7"]);

    let r1 = &netlist.components["R1"];
    assert_eq!(r1.mpn.as_deref(), Some("RC0402FR-0710KL"));
    assert_eq!(r1.value.as_deref(), Some("10k"));
    // `=Value` indirection resolved to the value itself: dropped.
    assert_eq!(r1.comment, None);

    let u1 = &netlist.components["U1"];
    assert_eq!(u1.mpn.as_deref(), Some("LM317"));
    assert!(matches!(
        &u1.pins["3"],
        PinEntry::Named { name, net } if name == "VIN" && net == "SIG"
    ));
}

#[test]
fn traced_demo_stops_at_the_rail() {
    let netlist = decode_file_header(&record_stream_bytes(&demo_records())).unwrap();
    let result = trace_from_net(&netlist, "SIG", &TraceOptions::default()).unwrap();

    assert_eq!(result.total_components, 2); // R1 and U1
    assert!(result.visited_nets.contains(&"+3V3".to_string()));
    assert!(!result.visited_nets.contains(&"NC".to_string()));
}

#[test]
fn unlabeled_nets_take_smallest_pin_name() {
    let records = vec![
        s("RECORD=1|CURRENTPARTID=1"),
        s("RECORD=34|OWNERINDEX=0|TEXT=R9"),
        s("RECORD=2|OWNERINDEX=0|OWNERPARTID=1|DESIGNATOR=2|NAME=2|LOCATION.X=0|LOCATION.Y=0|PINLENGTH=1|PINCONGLOMERATE=0"),
        s("RECORD=1|CURRENTPARTID=1"),
        s("RECORD=34|OWNERINDEX=3|TEXT=U2"),
        s("RECORD=2|OWNERINDEX=3|OWNERPARTID=1|DESIGNATOR=1|NAME=1|LOCATION.X=2|LOCATION.Y=0|PINLENGTH=1|PINCONGLOMERATE=2"),
    ];
    let netlist = decode_file_header(&record_stream_bytes(&records)).unwrap();
    assert_eq!(netlist.nets["NetR9_2"]["R9"], vec!["2"]);
    assert_eq!(netlist.nets["NetR9_2"]["U2"], vec!["1"]);
}

#[test]
fn repeated_parses_are_structurally_identical() {
    let stream = record_stream_bytes(&demo_records());
    let first = decode_file_header(&stream).unwrap();
    let second = decode_file_header(&stream).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn empty_schematic_decodes_to_empty_model() {
    let records = vec![s(
        "HEADER=Protel for Windows - Schematic Capture Binary File Version 5.0",
    )];
    let netlist = decode_file_header(&record_stream_bytes(&records)).unwrap();
    assert!(netlist.nets.is_empty());
    assert!(netlist.components.is_empty());
}

#[test]
fn single_pin_nets_are_suppressed() {
    // One component whose only pin touches nothing.
    let records = vec![
        s("RECORD=1|CURRENTPARTID=1"),
        s("RECORD=34|OWNERINDEX=0|TEXT=U3"),
        s("RECORD=2|OWNERINDEX=0|OWNERPARTID=1|DESIGNATOR=1|NAME=1|LOCATION.X=0|LOCATION.Y=0|PINLENGTH=1|PINCONGLOMERATE=0"),
    ];
    let netlist = decode_file_header(&record_stream_bytes(&records)).unwrap();
    // The lone pin carries no connection information: it is NC.
    assert_eq!(netlist.components["U3"].pins["1"].net(), "NC");
    assert_eq!(netlist.nets.len(), 1);
    assert!(netlist.nets.contains_key("NC"));
}

#[test]
fn parses_schdoc_from_compound_container() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.SchDoc");
    let stream = record_stream_bytes(&demo_records());
    std::fs::write(&path, schdoc_container(&stream)).unwrap();

    let netlist = parse_schdoc(&path).unwrap();
    netlist.check_symmetry().unwrap();
    assert!(netlist.nets.contains_key("SIG"));
}

#[test]
fn project_merges_sheets_by_net_name() {
    fn sheet(refdes: &str, port: &str) -> Vec<String> {
        vec![
            s("RECORD=1|CURRENTPARTID=1"),
            format!("RECORD=34|OWNERINDEX=0|TEXT={refdes}"),
            s("RECORD=2|OWNERINDEX=0|OWNERPARTID=1|DESIGNATOR=1|NAME=1|LOCATION.X=0|LOCATION.Y=0|PINLENGTH=1|PINCONGLOMERATE=0"),
            format!("RECORD=17|LOCATION.X=1|LOCATION.Y=0|TEXT={port}"),
        ]
    }

    let dir = tempfile::tempdir().unwrap();
    for (name, refdes) in [("sheet1.SchDoc", "R1"), ("sheet2.SchDoc", "C1")] {
        let stream = record_stream_bytes(&sheet(refdes, "VCC"));
        std::fs::write(dir.path().join(name), schdoc_container(&stream)).unwrap();
    }
    let project = dir.path().join("demo.PrjPcb");
    std::fs::write(
        &project,
        "[Document1]\nDocumentPath=sheet1.SchDoc\n[Document2]\nDocumentPath=sheet2.SchDoc\n",
    )
    .unwrap();

    let netlist = parse_project(&project).unwrap();
    netlist.check_symmetry().unwrap();
    assert_eq!(netlist.nets["VCC"]["R1"], vec!["1"]);
    assert_eq!(netlist.nets["VCC"]["C1"], vec!["1"]);
}

#[test]
fn project_without_documents_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("empty.PrjPcb");
    std::fs::write(&project, "[Design]\nVersion=1.0\n").unwrap();
    assert!(parse_project(&project).is_err());
}

#[test]
fn dispatch_rejects_unsupported_extension() {
    let err = xnet_eda::parse_design(Path::new("board.brd")).unwrap_err();
    assert!(err.to_string().contains("unsupported"));
}
