//! Integration tests for the export pipeline.

use std::path::{Path, PathBuf};

use wincast::asciicast::{Cast, CastWriter, Event, EventKind, Header};
use wincast::export::{concat, export, export_cast, CastTransform, ExportOptions};

fn ten_second_recording(dir: &Path) -> PathBuf {
    let path = dir.join("ten.cast");
    let mut writer = CastWriter::create(&path, &Header::new(80, 24)).unwrap();
    for i in 0..=20 {
        writer
            .write_event(&Event::output(i as f64 * 0.5, format!("line {}\r\n", i)))
            .unwrap();
    }
    writer.close().unwrap();
    path
}

#[test]
fn speed_two_halves_duration_and_keeps_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let input = ten_second_recording(dir.path());
    let output = dir.path().join("fast.cast");

    let transform = CastTransform {
        speed: 2.0,
        ..Default::default()
    };
    export_cast(&input, &output, &transform).unwrap();

    let original = Cast::load(&input).unwrap();
    let exported = Cast::load(&output).unwrap();

    assert_eq!(exported.events.len(), original.events.len());
    assert!((exported.duration() - 5.0).abs() < 1e-6);

    let original_bytes: String = original.events.iter().map(|e| e.data.clone()).collect();
    let exported_bytes: String = exported.events.iter().map(|e| e.data.clone()).collect();
    assert_eq!(original_bytes, exported_bytes);
}

#[test]
fn identity_export_is_byte_equivalent() {
    let dir = tempfile::tempdir().unwrap();
    let input = ten_second_recording(dir.path());
    let output = dir.path().join("copy.cast");

    export_cast(&input, &output, &CastTransform::default()).unwrap();

    assert_eq!(
        std::fs::read(&input).unwrap(),
        std::fs::read(&output).unwrap()
    );
}

#[test]
fn concat_mixes_widths_and_marks_the_join() {
    let dir = tempfile::tempdir().unwrap();

    let narrow = dir.path().join("narrow.cast");
    let mut writer = CastWriter::create(&narrow, &Header::new(80, 24)).unwrap();
    writer.write_event(&Event::output(0.0, "first")).unwrap();
    writer.write_event(&Event::output(3.0, "still first")).unwrap();
    writer.close().unwrap();

    let wide = dir.path().join("wide.cast");
    let mut writer = CastWriter::create(&wide, &Header::new(120, 30)).unwrap();
    writer.write_event(&Event::output(0.5, "second")).unwrap();
    writer.close().unwrap();

    let output = dir.path().join("joined.cast");
    concat(&[narrow.clone(), wide.clone()], &output, 1.0).unwrap();

    let cast = Cast::load(&output).unwrap();
    assert_eq!(cast.header.width, 120);
    assert_eq!(cast.header.height, 30);

    let markers: Vec<&Event> = cast.events.iter().filter(|e| e.is_marker()).collect();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].data, "wide.cast");

    let mut last = 0.0;
    for event in &cast.events {
        assert!(
            event.time >= last,
            "event at {} before {}",
            event.time,
            last
        );
        last = event.time;
    }
}

#[test]
fn trim_and_cap_compose_with_speed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("long.cast");
    let mut writer = CastWriter::create(&input, &Header::new(80, 24)).unwrap();
    writer.write_event(&Event::output(0.0, "skip")).unwrap();
    writer.write_event(&Event::output(2.0, "keep a")).unwrap();
    writer.write_event(&Event::output(30.0, "keep b")).unwrap();
    writer.write_event(&Event::output(90.0, "skip late")).unwrap();
    writer.close().unwrap();

    let output = dir.path().join("cut.cast");
    let transform = CastTransform {
        speed: 2.0,
        idle_cap: Some(1.0),
        trim_start: 1.0,
        trim_end: Some(60.0),
        ..Default::default()
    };
    export_cast(&input, &output, &transform).unwrap();

    let cast = Cast::load(&output).unwrap();
    assert_eq!(cast.events.len(), 2);
    // First kept event: scaled (2-1)/2 = 0.5, capped gap from 0 -> 0.5.
    assert!((cast.events[0].time - 0.5).abs() < 1e-9);
    // Second: scaled (30-1)/2 = 14.5, gap 14.0 capped to 1.0.
    assert!((cast.events[1].time - 1.5).abs() < 1e-9);
}

#[test]
fn export_dispatch_produces_each_text_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.cast");
    let mut writer = CastWriter::create(&input, &Header::new(40, 5)).unwrap();
    writer
        .write_event(&Event::output(0.0, "echo hello\r\nhello\r\n"))
        .unwrap();
    writer.close().unwrap();

    for ext in ["txt", "json", "html", "svg", "cast"] {
        let output = dir.path().join(format!("out.{}", ext));
        let options = ExportOptions {
            output: Some(output.clone()),
            ..Default::default()
        };
        let written = export(&input, &options).unwrap();
        assert_eq!(written, output);
        assert!(output.exists(), "no output for {}", ext);
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }
}

#[test]
fn exported_cast_parses_and_preserves_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("kinds.cast");
    let mut writer = CastWriter::create(&input, &Header::new(80, 24)).unwrap();
    writer.write_event(&Event::output(0.0, "o")).unwrap();
    writer
        .write_event(&Event::new(0.5, EventKind::Input, "i"))
        .unwrap();
    writer.write_event(&Event::resize(1.0, 90, 30)).unwrap();
    writer.write_event(&Event::marker(1.5, "m")).unwrap();
    writer.close().unwrap();

    let output = dir.path().join("kinds-out.cast");
    export_cast(&input, &output, &CastTransform::default()).unwrap();

    let cast = Cast::load(&output).unwrap();
    let kinds: Vec<EventKind> = cast.events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            EventKind::Output,
            EventKind::Input,
            EventKind::Resize,
            EventKind::Marker
        ]
    );
}
