use aptward_catalog::ErrorCatalog;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const LOG: &str = "\
Reading Package Lists...
Building Dependency Tree...
The following packages will be upgraded
  vim-common vim-console
2 upgraded, 0 newly installed, 0 removed and 140 not upgraded.
Need to get 4711kB of archives.
E: Failed to fetch http://ftp.altlinux.org/pub/vim-common.rpm  404 Not Found
E: Unable to fetch some archives, maybe run apt-get update or try with --fix-missing?
";

fn bench_match_line_hit(c: &mut Criterion) {
    let catalog = ErrorCatalog::builtin();
    c.bench_function("catalog_match_last_signature", |b| {
        b.iter(|| {
            catalog.match_line(black_box(
                "Virtual name 'mta' has multiple providers; specify exact package name",
            ))
        });
    });
}

fn bench_match_line_miss(c: &mut Criterion) {
    let catalog = ErrorCatalog::builtin();
    c.bench_function("catalog_match_miss", |b| {
        b.iter(|| catalog.match_line(black_box("Building Dependency Tree...")));
    });
}

fn bench_match_all_log(c: &mut Criterion) {
    let catalog = ErrorCatalog::builtin();
    c.bench_function("catalog_match_all_8_lines", |b| {
        b.iter(|| catalog.match_all(black_box(LOG).lines()));
    });
}

criterion_group!(
    benches,
    bench_match_line_hit,
    bench_match_line_miss,
    bench_match_all_log
);
criterion_main!(benches);
