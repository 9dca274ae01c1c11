use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use file_map::{FileMap, JsonCodec};
use shardmap::ShardMap;
use std::hint::black_box;
use std::time::Duration;

fn bench_insert_get_remove(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("insert_get_remove");
    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("rwlock", size), &size, |b, &size| {
            let db = FileMap::<String, i32>::open(dir.path().join(format!("igr_rw_{size}.bin")))
                .unwrap();
            b.iter(|| {
                for i in 0..size {
                    db.insert(format!("k{i}"), i as i32);
                }
                for i in 0..size {
                    black_box(db.get(&format!("k{i}")));
                }
                for i in 0..size {
                    db.remove(&format!("k{i}"));
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("shardmap", size), &size, |b, &size| {
            let db = FileMap::<String, i32, ShardMap<String, i32>>::open(
                dir.path().join(format!("igr_sm_{size}.bin")),
            )
            .unwrap();
            b.iter(|| {
                for i in 0..size {
                    db.insert(format!("k{i}"), i as i32);
                }
                for i in 0..size {
                    black_box(db.get(&format!("k{i}")));
                }
                for i in 0..size {
                    db.remove(&format!("k{i}"));
                }
            });
        });
    }
}

fn bench_flush(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("flush");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(8));
    for size in [100, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::new("bincode", size), &size, |b, &size| {
            let db = FileMap::<String, i32>::open(dir.path().join(format!("flush_{size}.bin")))
                .unwrap();
            db.extend((0..size).map(|i| (format!("k{i}"), i as i32)));
            b.iter(|| db.flush().unwrap());
        });
        group.bench_with_input(BenchmarkId::new("json", size), &size, |b, &size| {
            let db = FileMap::<String, i32>::builder(dir.path().join(format!("flush_{size}.json")))
                .codec(JsonCodec::new())
                .build()
                .unwrap();
            db.extend((0..size).map(|i| (format!("k{i}"), i as i32)));
            b.iter(|| db.flush().unwrap());
        });
    }
}

fn bench_update(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("update");
    for size in [100, 1000] {
        group.bench_with_input(BenchmarkId::new("rwlock", size), &size, |b, &size| {
            let db = FileMap::<String, i32>::open(dir.path().join(format!("update_{size}.bin")))
                .unwrap();
            db.extend((0..size).map(|i| (format!("k{i}"), i as i32)));
            b.iter(|| {
                for i in 0..size {
                    db.update(&format!("k{i}"), |v| *v += 1);
                }
            });
        });
    }
}

fn bench_open_close(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("open_close");
    group.sample_size(30);
    for size in [1000, 10_000] {
        let path = dir.path().join(format!("open_{size}.bin"));
        {
            let db = FileMap::<String, i32>::open(&path).unwrap();
            db.extend((0..size).map(|i| (format!("k{i}"), i as i32)));
        }
        group.bench_with_input(BenchmarkId::new("bincode", size), &path, |b, path| {
            b.iter(|| black_box(FileMap::<String, i32>::open(path).unwrap().len()));
        });
    }
}

criterion_group!(
    benches,
    bench_insert_get_remove,
    bench_flush,
    bench_update,
    bench_open_close,
);
criterion_main!(benches);
