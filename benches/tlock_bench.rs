use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use group::Group;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

use tlock::beacon::round_identity;
use tlock::bls::{hash_to_g1, SIGNATURE_DST};
use tlock::{ibe, stream};

fn bench_ibe(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let master = blstrs::Scalar::from(0x00c0_ffeeu64);
    let pk = blstrs::G2Projective::generator() * master;
    let identity = round_identity(1_000_000);
    let file_key = [7u8; ibe::FILE_KEY_LEN];

    c.bench_function("ibe_encrypt", |b| {
        b.iter(|| ibe::encrypt(&pk, &identity, &file_key, &mut rng))
    });

    let ct = ibe::encrypt(&pk, &identity, &file_key, &mut rng);
    let signature = hash_to_g1(&identity, SIGNATURE_DST) * master;
    c.bench_function("ibe_decrypt", |b| {
        b.iter(|| ibe::decrypt(&signature, &ct).expect("decrypt"))
    });
}

fn bench_stream(c: &mut Criterion) {
    let file_key = [9u8; ibe::FILE_KEY_LEN];
    let nonce = [3u8; stream::NONCE_LEN];
    let payload = vec![0u8; 1 << 20];

    c.bench_function("stream_seal_1mib", |b| {
        b.iter(|| {
            let mut sealed = Vec::with_capacity(payload.len() + 1024);
            stream::encrypt(&file_key, &nonce, &mut Cursor::new(&payload), &mut sealed)
                .expect("seal");
            sealed
        })
    });
}

criterion_group!(benches, bench_ibe, bench_stream);
criterion_main!(benches);
