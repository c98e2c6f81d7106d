use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flow_dissector::protocols::init_all;
use flow_dissector::*;

fn build_engine() -> DispatchEngine {
    let mut registry = ProtocolRegistry::new();
    let mut next_id = 0;
    init_all(&mut registry, &mut next_id).expect("builtin registration");
    DispatchEngine::new(registry, EngineConfig::default()).expect("engine")
}

fn bench_dispatch(c: &mut Criterion) {
    let engine = build_engine();
    let cip = [0x02u8, 0x00, 0x02, 0x80, 0x08, 0x00, 0x01, 0x00];
    let enip = [0x00u8, 0x6F, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00];

    c.bench_function("dispatch_cipio_confirm", |b| {
        let packet = PacketView::udp(IpVersion::V4, 40000, 2222, &cip);
        b.iter(|| {
            let mut flow = FlowState::from_packet(&packet);
            black_box(engine.process_packet(&mut flow, black_box(&packet)))
        })
    });

    c.bench_function("dispatch_udp_miss", |b| {
        let packet = PacketView::udp(IpVersion::V6, 40000, 5353, &cip);
        b.iter(|| {
            let mut flow = FlowState::from_packet(&packet);
            black_box(engine.process_packet(&mut flow, black_box(&packet)))
        })
    });

    c.bench_function("dispatch_enip_confirm", |b| {
        let packet = PacketView::tcp(IpVersion::V4, 50000, 44818, &enip);
        b.iter(|| {
            let mut flow = FlowState::from_packet(&packet);
            black_box(engine.process_packet(&mut flow, black_box(&packet)))
        })
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
