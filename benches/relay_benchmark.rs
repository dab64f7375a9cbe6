use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::net::SocketAddr;

use switchboard::signaling::{ClientMessage, Connection, RoomDirectory, dispatch};

const OFFER: &str = r#"{"type":"offer","targetId":"B","sdp":{"type":"offer","sdp":"v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n"}}"#;

fn addr() -> SocketAddr {
    "127.0.0.1:5000".parse().unwrap()
}

/// decoding benchmark
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("offer", |b| {
        b.iter(|| black_box(ClientMessage::decode(black_box(OFFER)).unwrap()))
    });

    group.finish();
}

/// join + leave cycle in a room that already has members
fn bench_membership(c: &mut Criterion) {
    let directory = RoomDirectory::new();
    let mut residents = Vec::new();
    for i in 0..8 {
        let (mut conn, rx) = Connection::new(addr(), directory.clone());
        let join = format!(r#"{{"type":"join","roomId":"bench","userId":"r{}"}}"#, i);
        dispatch(&mut conn, &join).unwrap();
        residents.push((conn, rx));
    }

    let mut group = c.benchmark_group("Membership");
    group.throughput(Throughput::Elements(1));

    group.bench_function("join_leave", |b| {
        let (mut conn, _rx) = Connection::new(addr(), directory.clone());
        b.iter(|| {
            dispatch(&mut conn, r#"{"type":"join","roomId":"bench","userId":"x"}"#).unwrap();
            dispatch(&mut conn, r#"{"type":"leave"}"#).unwrap();
            // keep the residents' queues from growing without bound
            for (_, rx) in residents.iter_mut() {
                while rx.try_recv().is_ok() {}
            }
        })
    });

    group.finish();
}

/// full decode-lookup-forward path
fn bench_forward(c: &mut Criterion) {
    let directory = RoomDirectory::new();
    let (mut a, _a_rx) = Connection::new(addr(), directory.clone());
    let (mut b_conn, mut b_rx) = Connection::new(addr(), directory.clone());
    dispatch(&mut a, r#"{"type":"join","roomId":"bench","userId":"A"}"#).unwrap();
    dispatch(&mut b_conn, r#"{"type":"join","roomId":"bench","userId":"B"}"#).unwrap();

    let mut group = c.benchmark_group("Forward");
    group.throughput(Throughput::Elements(1));

    group.bench_function("offer", |b| {
        b.iter(|| {
            dispatch(&mut a, black_box(OFFER)).unwrap();
            black_box(b_rx.try_recv().unwrap());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_membership, bench_forward);
criterion_main!(benches);
