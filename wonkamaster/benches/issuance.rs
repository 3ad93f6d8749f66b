//! Criterion benchmarks for claim computation and token issuance.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use wonka::{Claim, SigningKey};
use wonka_directory::MemoryGroupDirectory;
use wonkamaster::{CallerClass, ClaimProtocol, ClaimVerifier, Issuer, compute_approved_claims};

/// Approved-claim computation as the requested list grows.
fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_approved_claims");
    let directory = (0..64).fold(MemoryGroupDirectory::new(), |dir, i| {
        dir.with_member("alice", &format!("group-{}", i * 2))
    });

    for size in [4usize, 16, 64] {
        let requested = (0..size)
            .map(|i| format!("AD:group-{i}"))
            .chain(["EVERYONE".to_string()])
            .collect::<Vec<_>>()
            .join(",");
        group.bench_with_input(BenchmarkId::new("user", size), &requested, |b, requested| {
            b.iter(|| {
                compute_approved_claims(
                    black_box(requested),
                    "alice@uber.com",
                    CallerClass::User,
                    &directory,
                )
            });
        });
        group.bench_with_input(BenchmarkId::new("service", size), &requested, |b, requested| {
            b.iter(|| {
                compute_approved_claims(
                    black_box(requested),
                    "svc-a",
                    CallerClass::Service,
                    &directory,
                )
            });
        });
    }

    group.finish();
}

/// Issuing and verifying tokens in both protocols.
fn bench_tokens(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokens");
    let authority = SigningKey::generate();
    let caller = SigningKey::generate();
    let issuer = Issuer::new(authority.clone());
    let verifier = ClaimVerifier::new(vec![authority.verifying_key()]);
    let now = chrono::Utc::now().timestamp();
    let claim = Claim::new("svc-a", "EVERYONE,svc-a,AD:ops", "svc-b", now, now + 3_600);

    for (name, protocol) in [("v1", ClaimProtocol::V1), ("v2", ClaimProtocol::V2)] {
        group.bench_function(BenchmarkId::new("issue", name), |b| {
            b.iter(|| issuer.issue(black_box(claim.clone()), protocol, &caller.verifying_key()));
        });

        let token = issuer
            .issue(claim.clone(), protocol, &caller.verifying_key())
            .expect("issue benchmark token");
        group.bench_function(BenchmarkId::new("verify", name), |b| {
            b.iter(|| verifier.verify(black_box(&token), Some(&caller), now));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute, bench_tokens);
criterion_main!(benches);
