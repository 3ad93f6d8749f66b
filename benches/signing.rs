//! Criterion benchmarks for model signing and verification.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use wonka::{Certificate, Claim, ClaimRequest, EntityType, SigningKey};

fn certificate(holder: &SigningKey, tags: usize) -> Certificate {
    let mut cert = Certificate::new(
        "svc-a",
        EntityType::Service,
        "h1.prod.example",
        &holder.verifying_key(),
        1_000,
        73_000,
    );
    for i in 0..tags {
        cert = cert.with_tag(format!("tag-{i}"), "x".repeat(64));
    }
    cert
}

/// Certificate signing and verification with growing tag maps.
fn bench_certificate(c: &mut Criterion) {
    let mut group = c.benchmark_group("certificate");
    let authority = SigningKey::generate();
    let holder = SigningKey::generate();
    let roots = [authority.verifying_key()];

    for tags in [0usize, 4, 32] {
        let mut cert = certificate(&holder, tags);
        group.bench_with_input(BenchmarkId::new("sign", tags), &tags, |b, _| {
            b.iter(|| cert.clone().sign(black_box(&authority)));
        });

        cert.sign(&authority).expect("sign benchmark certificate");
        group.throughput(Throughput::Bytes(
            cert.to_bytes().expect("encode").len() as u64,
        ));
        group.bench_with_input(BenchmarkId::new("validate", tags), &cert, |b, cert| {
            b.iter(|| black_box(cert).check(&roots, 2_000, 60));
        });
    }

    group.finish();
}

/// Signing bytes for the legacy and current claim request formats.
fn bench_claim_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_request");
    let claims = (0..16).map(|i| format!("AD:group-{i}")).collect::<Vec<_>>().join(",");

    let current = ClaimRequest::new("svc-a", claims.clone(), "svc-b", 1_000, 2_000);
    let mut legacy = current.clone();
    legacy.version = "1.0.0".into();

    for (name, req) in [("current", &current), ("legacy", &legacy)] {
        group.bench_with_input(BenchmarkId::new("signing_bytes", name), req, |b, req| {
            b.iter(|| black_box(req).signing_bytes());
        });
    }

    let authority = SigningKey::generate();
    let mut claim = Claim::new("svc-a", &claims, "svc-b", 1_000, 2_000);
    claim.sign(&authority).expect("sign benchmark claim");
    let roots = [authority.verifying_key()];
    group.bench_function("claim_verify", |b| b.iter(|| black_box(&claim).verify(&roots)));

    group.finish();
}

criterion_group!(benches, bench_certificate, bench_claim_request);
criterion_main!(benches);
