extern crate habe;
#[macro_use]
extern crate criterion;

use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId};
use habe::schemes::hybrid;
use habe::schemes::hybrid::KeyWrapMode;

fn criterion_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("setup");
    group.bench_with_input(BenchmarkId::new("HYBRID", 1), &1_usize, |b, &_usize| {
        b.iter(|| {
            hybrid::setup()
        } );
    });
    group.finish();
}

fn criterion_keygen(c: &mut Criterion) {
    let gk = hybrid::setup();
    let (_, ask) = hybrid::authgen(&String::from("Hospital"));
    let mut group = c.benchmark_group("keygen");
    group.bench_with_input(BenchmarkId::new("HYBRID", 1), &1_usize, |b, &_usize| {
        b.iter(|| {
            hybrid::keygen(&gk, &ask, &String::from("alice"), &String::from("Doctor@Hospital")).unwrap()
        } );
    });
    group.finish();
}

fn criterion_encrypt_decrypt(c: &mut Criterion) {
    let gk = hybrid::setup();
    let (pk, ask) = hybrid::authgen(&String::from("Hospital"));
    let gid = String::from("alice");
    let mut sk = hybrid::HybridAbeUserKey::new(gid.clone());
    sk.insert(hybrid::keygen(&gk, &ask, &gid, &String::from("Doctor@Hospital")).unwrap());
    let mut store = std::collections::BTreeMap::new();
    store.insert(ask.name.clone(), ask);
    let policy = String::from("Doctor@Hospital OR Nurse@Hospital");
    let plaintext = vec![0u8; 1024];
    let pks = vec![pk];

    let mut group = c.benchmark_group("encrypt");
    group.bench_with_input(BenchmarkId::new("HYBRID", 1), &1_usize, |b, &_usize| {
        b.iter(|| {
            hybrid::encrypt(&gk, &pks, &policy, &plaintext, KeyWrapMode::PerAttribute).unwrap()
        } );
    });
    group.finish();

    let ct = hybrid::encrypt(&gk, &pks, &policy, &plaintext, KeyWrapMode::PerAttribute).unwrap();
    let mut group = c.benchmark_group("decrypt");
    group.bench_with_input(BenchmarkId::new("HYBRID", 1), &1_usize, |b, &_usize| {
        b.iter(|| {
            hybrid::decrypt(&gk, &sk, &store, &ct).unwrap()
        } );
    });
    group.finish();
}

criterion_group!(benches,
    criterion_setup,
    criterion_keygen,
    criterion_encrypt_decrypt,
);

criterion_main!(benches);
