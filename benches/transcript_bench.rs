use criterion::{black_box, criterion_group, criterion_main, Criterion};
use yt_ai_transcript::transcript::{CaptionParser, RawCaptionEvent, SegmentNormalizer};
use yt_ai_transcript::llm::truncate_transcript;

fn json3_payload(events: usize) -> String {
    let body = (0..events)
        .map(|i| {
            format!(
                r#"{{"tStartMs":{},"dDurationMs":1200,"segs":[{{"utf8":"caption word {}"}},{{"utf8":" and more"}}]}}"#,
                i * 1500,
                i
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(r#"{{"events":[{}]}}"#, body)
}

fn xml_payload(events: usize) -> String {
    let body = (0..events)
        .map(|i| format!(r#"<text start="{}.5" dur="1.2">line {} it&amp;#39;s &lt;fine&gt;</text>"#, i, i))
        .collect::<String>();
    format!(r#"<?xml version="1.0" encoding="utf-8" ?><transcript>{}</transcript>"#, body)
}

fn bench_parsing(c: &mut Criterion) {
    let parser = CaptionParser::new();
    let json = json3_payload(1000);
    let xml = xml_payload(1000);

    c.bench_function("parse_json3_1000_events", |b| {
        b.iter(|| black_box(parser.parse(black_box(&json))))
    });

    c.bench_function("parse_xml_1000_events", |b| {
        b.iter(|| black_box(parser.parse(black_box(&xml))))
    });
}

fn bench_normalization(c: &mut Criterion) {
    let normalizer = SegmentNormalizer::new();
    let events: Vec<RawCaptionEvent> = (0..2000u64)
        .map(|i| RawCaptionEvent::new(i * 900, 800, if i % 3 == 0 { "short" } else { "a somewhat longer caption line" }))
        .collect();

    c.bench_function("normalize_2000_events", |b| {
        b.iter(|| black_box(normalizer.normalize(black_box(&events))))
    });

    let text = "word ".repeat(40_000);
    c.bench_function("truncate_200k_chars", |b| {
        b.iter(|| black_box(truncate_transcript(black_box(&text), 100_000).len()))
    });
}

criterion_group!(benches, bench_parsing, bench_normalization);
criterion_main!(benches);
