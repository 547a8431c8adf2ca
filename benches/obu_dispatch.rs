use criterion::{black_box, criterion_group, criterion_main, Criterion};

use av1_obu_parser::bitreader::BitReader;
use av1_obu_parser::parser::Parser;

const TEMPORAL_DELIMITER: [u8; 2] = [0x12, 0x00];

// AOM sample sequence header OBU, `has_size_field = 1`, 16x16 profile 0.
const SEQUENCE_HEADER_OBU: [u8; 12] = [
    0x0a, 0x0a, 0x00, 0x00, 0x00, 0x01, 0x9f, 0xfb, 0xff, 0xf3, 0x00, 0x80,
];

fn bench_bitreader(c: &mut Criterion) {
    c.bench_function("bitreader_read_bits_32", |b| {
        b.iter(|| {
            let data = black_box(&SEQUENCE_HEADER_OBU);
            let mut r = BitReader::new(data);
            for _ in 0..(data.len() * 8 / 7) {
                let _ = r.read_bits(7);
            }
        })
    });
}

fn bench_obu_dispatch(c: &mut Criterion) {
    c.bench_function("parse_next_obu_temporal_delimiter", |b| {
        b.iter(|| {
            let mut parser = Parser::new();
            let _ = parser.parse_next_obu(black_box(&TEMPORAL_DELIMITER));
        })
    });

    c.bench_function("parse_next_obu_sequence_header", |b| {
        b.iter(|| {
            let mut parser = Parser::new();
            let _ = parser.parse_next_obu(black_box(&SEQUENCE_HEADER_OBU));
        })
    });
}

criterion_group!(benches, bench_bitreader, bench_obu_dispatch);
criterion_main!(benches);
