use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use haos_sequencer::sequencer::{
    EventLog, LookaheadScheduler, OfflineRenderer, ScheduledEvent, StepPattern, TrackConfig,
    Transport, build_arrangement, params,
};
use haos_sequencer::{ArrangementTemplate, EngineConfig, Position, Sequencer};

fn busy_sequencer(tracks: usize) -> Sequencer {
    let mut seq = Sequencer::new(&EngineConfig::default()).unwrap();
    for i in 0..tracks {
        let steps: Vec<bool> = (0..16).map(|s| (s + i) % 3 != 0).collect();
        let id = seq
            .add_track(
                TrackConfig::new(format!("Track {}", i), "tr909")
                    .with_pattern(StepPattern::from_bools(&steps)),
            )
            .unwrap();
        for bar in 0..4 {
            seq.schedule_automation(id, bar, params::VOLUME, 0.2 * bar as f32)
                .unwrap();
        }
    }
    seq
}

/// Benchmark scheduling one step (the work done per timer tick)
fn bench_process_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_step");

    for tracks in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(tracks), &tracks, |b, &n| {
            let mut seq = busy_sequencer(n);
            let mut log = EventLog::new();
            b.iter(|| {
                seq.process_step();
                let now = seq.clock().next_step_time();
                black_box(seq.process(now, &mut log));
                log.clear();
            });
        });
    }
    group.finish();
}

/// Benchmark a full offline render of an arrangement
fn bench_render_arrangement(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.sample_size(20);

    for template in [ArrangementTemplate::Minimal, ArrangementTemplate::Epic] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", template)),
            &template,
            |b, &template| {
                b.iter(|| {
                    let mut seq = Sequencer::new(&EngineConfig::default()).unwrap();
                    build_arrangement(&mut seq, template).unwrap();
                    let mut transport = Transport::new(seq);
                    black_box(OfflineRenderer::default().render(&mut transport, 16.0))
                });
            },
        );
    }
    group.finish();
}

/// Benchmark the look-ahead queue with out-of-order inserts
fn bench_scheduler(c: &mut Criterion) {
    c.bench_function("scheduler_push_drain_256", |b| {
        b.iter(|| {
            let mut scheduler = LookaheadScheduler::new(0.1);
            for i in 0..256u32 {
                let time = f64::from((i * 37) % 256) * 0.01;
                scheduler.push(ScheduledEvent::Step {
                    position: Position::zero(),
                    time,
                });
            }
            black_box(scheduler.drain_due(3.0).len())
        });
    });
}

criterion_group!(
    benches,
    bench_process_step,
    bench_render_arrangement,
    bench_scheduler
);
criterion_main!(benches);
