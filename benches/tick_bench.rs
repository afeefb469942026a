//! Tick benchmarks
//!
//! Measures the coordinator's per-tick cost against a headless backend:
//! an idle tick where nothing is dirty, and a tick that scrolls a long
//! control panel by one row.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use crystalline::{
    shared, ContentRef, ControlPanel, HeadlessBackend, Interaction, Key, LabelControl, LayoutRef,
    UiContext,
};

fn long_panel(items: usize) -> LayoutRef {
    let controls: Vec<ContentRef> = (0..items)
        .map(|i| shared(LabelControl::new(format!("Item {i}"))).into())
        .collect();
    shared(ControlPanel::new("Bench", controls)).into()
}

fn context(width: u16, height: u16, root: LayoutRef) -> UiContext {
    UiContext::begin(Box::new(HeadlessBackend::new(width, height)), root)
        .expect("headless backend never fails")
}

fn bench_idle_tick(c: &mut Criterion) {
    let mut ui = context(20, 4, long_panel(64));
    ui.update().expect("first tick");

    c.bench_function("idle_tick", |b| {
        b.iter(|| {
            ui.update().expect("tick");
            black_box(ui.current_focus());
        });
    });
}

fn bench_scroll_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll_tick");

    for (width, height) in [(16u16, 2u16), (20, 4), (40, 25)] {
        let mut ui = context(width, height, long_panel(256));
        ui.update().expect("first tick");
        let mut down = true;
        let mut steps = 0;

        group.bench_function(format!("{width}x{height}"), |b| {
            b.iter(|| {
                if steps == 200 {
                    down = !down;
                    steps = 0;
                }
                steps += 1;
                let key = if down { Key::Down } else { Key::Up };
                ui.interact(Interaction::down(key));
                ui.update().expect("tick");
                black_box(ui.current_focus());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_idle_tick, bench_scroll_tick);
criterion_main!(benches);
