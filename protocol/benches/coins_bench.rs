// Coin arithmetic benchmarks for the LOOM protocol.
//
// Covers single-value normalization, multiplication, and normalizing coin
// sets of various sizes with heavy ticker duplication.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use loom_protocol::coin::{normalize_coins, Coin, Coins};

const TICKERS: [&str; 8] = ["ADA", "BTC", "DOT", "ETH", "IOV", "LSK", "XRP", "ZEC"];

fn bench_normalize(c: &mut Criterion) {
    let coin = Coin::new(17, 4_500_000_000, "IOV");

    c.bench_function("coin/normalize", |b| {
        b.iter(|| coin.normalize().unwrap());
    });
}

fn bench_multiply(c: &mut Criterion) {
    let coin = Coin::new(123, 456_789_012, "IOV");

    c.bench_function("coin/multiply", |b| {
        b.iter(|| coin.multiply(1_000).unwrap());
    });
}

fn bench_normalize_coins(c: &mut Criterion) {
    let mut group = c.benchmark_group("coins/normalize");

    for size in [8, 64, 512, 4096] {
        let input: Vec<Coin> = (0..size)
            .map(|i| {
                let sign = if i % 3 == 0 { -1 } else { 1 };
                Coin::new(sign * (i as i64 % 50), 250_000_000 * sign, TICKERS[i % TICKERS.len()])
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| normalize_coins(input.iter().cloned()).unwrap());
        });
    }

    group.finish();
}

fn bench_combine(c: &mut Criterion) {
    let left = normalize_coins(TICKERS.iter().map(|t| Coin::new(10, 0, *t))).unwrap();
    let right: Coins = normalize_coins(TICKERS.iter().map(|t| Coin::new(-3, -5, *t))).unwrap();

    c.bench_function("coins/combine", |b| {
        b.iter(|| left.combine(&right).unwrap());
    });
}

criterion_group!(
    benches,
    bench_normalize,
    bench_multiply,
    bench_normalize_coins,
    bench_combine,
);
criterion_main!(benches);
