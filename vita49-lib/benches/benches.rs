use rand::Rng;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use vita49::packet::{Body, SampleFormat};
use vita49::{read_packets, Packet};

fn words(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

// Data packet with stream id and 1000 random 16-bit IQ samples.
fn data_packet() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut dat = words(&[0x1000_0000 | 1002, 1]);
    for _ in 0..4000 {
        let b: u8 = rng.gen();
        dat.push(b);
    }
    dat
}

fn bench_decode_context(c: &mut Criterion) {
    #[rustfmt::skip]
    let dat = words(&[
        0x4000_000c, 1,
        // bandwidth, IF reference frequency, gain, sample rate, payload format
        1 << 29 | 1 << 28 | 1 << 23 | 1 << 21 | 1 << 15,
        0, 0x0010_0000,
        0x0000_5f5e, 0x1000_0000,
        0x0000_0080,
        0x0000_00f4, 0x2400_0000,
        0x2000_03cf, 0,
    ]);
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(dat.len() as u64));
    group.bench_function("context", |b| {
        b.iter(|| Packet::decode(&dat).unwrap());
    });
    group.finish();
}

fn bench_read_data(c: &mut Criterion) {
    let packet = data_packet();
    let dat: Vec<u8> = packet.iter().copied().cycle().take(packet.len() * 100).collect();

    let mut group = c.benchmark_group("read");
    group.throughput(Throughput::Bytes(dat.len() as u64));
    group.bench_function("data", |b| {
        b.iter(|| {
            let packets: Vec<Packet> = read_packets(&dat[..]).map_while(Result::ok).collect();
            assert_eq!(packets.len(), 100);
        });
    });
    group.finish();
}

fn bench_samples(c: &mut Criterion) {
    let packet = Packet::decode(&data_packet()).unwrap();
    let Body::Data(data) = packet.body else {
        panic!("expected data packet");
    };

    let mut group = c.benchmark_group("samples");
    group.throughput(Throughput::Bytes(data.payload.len() as u64));
    group.bench_function("i16", |b| {
        b.iter(|| data.samples(SampleFormat::I16Be));
    });
    group.finish();
}

criterion_group!(benches, bench_decode_context, bench_read_data, bench_samples);
criterion_main!(benches);
