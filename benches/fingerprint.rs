//! Fingerprinting benchmarks. Fingerprints are computed on every build
//! request and on every `only_metadata_changed` probe, so they must
//! stay cheap even for large specs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nixforge::domain::models::ShellSpec;
use nixforge::services::fingerprint::fingerprint;

fn bench_fingerprint(c: &mut Criterion) {
    let small = ShellSpec::mk_shell(["python3", "ruff"]);

    let large = ShellSpec::mk_shell((0..200).map(|i| format!("package-{i}")))
        .with_library_paths((0..50).map(|i| format!("lib-{i}")))
        .with_shell_hook("export PATH=$PATH:$HOME/.local/bin\n".repeat(20))
        .with_override("nixpkgs", "/nix/store/abcdefghijklmnopqrstuvwxyz-source");

    c.bench_function("fingerprint_small_spec", |b| {
        b.iter(|| fingerprint(black_box(&small)));
    });

    c.bench_function("fingerprint_large_spec", |b| {
        b.iter(|| fingerprint(black_box(&large)));
    });
}

criterion_group!(benches, bench_fingerprint);
criterion_main!(benches);
