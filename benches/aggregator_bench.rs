//! Criterion benchmarks for the aggregator and list queries

use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use herdbook::services::dates::{local_to_utc, WALL_CLOCK_FORMAT};
use herdbook::services::loader::records_from_slice;
use herdbook::services::query::{filter_items, SessionSort};
use herdbook::services::Aggregator;
use herdbook::types::MilkingSession;
use std::hint::black_box;

const HERD_SIZE: u64 = 120;

/// Two milkings per cow per day over `days` days ending on `end`
fn synthetic_sessions(end: NaiveDate, days: i64) -> Vec<MilkingSession> {
    let start = end - Duration::days(days - 1);
    let mut sessions = Vec::with_capacity((days as usize) * HERD_SIZE as usize * 2);
    let mut id = 0;

    for offset in 0..days {
        let date = start + Duration::days(offset);
        for cow_id in 1..=HERD_SIZE {
            for hour in [6, 17] {
                id += 1;
                let naive = date.and_hms_opt(hour, (cow_id % 60) as u32, 0).unwrap();
                sessions.push(MilkingSession {
                    id,
                    cow_id: Some(cow_id),
                    milker_id: Some(cow_id % 7 + 1),
                    volume: 4.0 + (id % 9) as f64 * 0.5,
                    milking_time: Some(local_to_utc(naive)),
                    notes: None,
                    cow_name: None,
                    milker_name: None,
                });
            }
        }
    }
    sessions
}

fn bench_daily_series(c: &mut Criterion) {
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let mut group = c.benchmark_group("aggregator");

    for days in [7, 30, 365] {
        let sessions = synthetic_sessions(end, days);
        group.throughput(Throughput::Elements(sessions.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("daily_series", format!("{} days", days)),
            &sessions,
            |b, sessions| {
                b.iter(|| Aggregator::last_days(black_box(sessions), end, days as u32));
            },
        );
    }

    group.finish();
}

fn bench_per_cow_totals(c: &mut Criterion) {
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let sessions = synthetic_sessions(end, 90);
    let cow_ids: Vec<u64> = (1..=HERD_SIZE).collect();

    let mut group = c.benchmark_group("aggregator");
    group.throughput(Throughput::Elements(sessions.len() as u64));
    group.bench_function("per_cow_totals", |b| {
        b.iter(|| Aggregator::per_cow_totals(black_box(&sessions), &cow_ids, end));
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let sessions = synthetic_sessions(end, 30);

    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(sessions.len() as u64));
    group.bench_function("search_and_sort", |b| {
        b.iter(|| {
            let mut found = filter_items(black_box(&sessions), "evening", |_| true);
            SessionSort::VolumeDesc.sort_by(&mut found, |s| s);
            found.len()
        });
    });
    group.finish();
}

fn bench_parse_snapshot(c: &mut Criterion) {
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let records: Vec<serde_json::Value> = synthetic_sessions(end, 30)
        .iter()
        .map(|s| {
            serde_json::json!({
                "id": s.id,
                "cow_id": s.cow_id,
                "volume": format!("{:.1}", s.volume),
                "milking_time": s.local_time().map(|t| t.format(WALL_CLOCK_FORMAT).to_string()),
            })
        })
        .collect();
    let payload = serde_json::to_vec(&serde_json::json!({ "sessions": records })).unwrap();

    let mut group = c.benchmark_group("loader");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("records_from_slice", |b| {
        b.iter(|| {
            let mut bytes = payload.clone();
            let sessions: Vec<MilkingSession> = records_from_slice(black_box(&mut bytes)).unwrap();
            sessions.len()
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_daily_series,
    bench_per_cow_totals,
    bench_search,
    bench_parse_snapshot
);
criterion_main!(benches);
