// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for caption parsing and endpoint parsing.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use druckpost_core::{DeviceEndpoint, JobDefaults, parse_caption};

/// Typical captions plus one long chatty message.
fn bench_parse_caption(c: &mut Criterion) {
    let defaults = JobDefaults::default();

    c.bench_function("parse_caption (\"2 on\")", |b| {
        b.iter(|| black_box(parse_caption(black_box(Some("2 on")), &defaults)));
    });

    let chatty = "ciao, could you please print this 3 times off thanks ".repeat(20);
    c.bench_function("parse_caption (1 KiB chatter)", |b| {
        b.iter(|| black_box(parse_caption(black_box(Some(chatty.as_str())), &defaults)));
    });
}

fn bench_parse_endpoint(c: &mut Criterion) {
    c.bench_function("DeviceEndpoint::parse", |b| {
        b.iter(|| black_box(DeviceEndpoint::parse(black_box("socket://192.168.178.176:9100"))));
    });
}

criterion_group!(benches, bench_parse_caption, bench_parse_endpoint);
criterion_main!(benches);
