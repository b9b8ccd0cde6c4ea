use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use cube_blast::core::{
    CellPos, Grid, LevelCatalog, LevelData, MatchResolver, Rules, Session, SessionSnapshot,
};
use cube_blast::types::{ItemKind, TICK_MS};

const ALL_RED: [&str; 9] = [
    "r r r r r r r r",
    "r r r r r r r r",
    "r r r r r r r r",
    "r r r r r r r r",
    "r r r r r r r r",
    "r r r r r r r r",
    "r r r r r r r r",
    "r r r r r r r r",
    "r r r r r r r r",
];

fn red_session(rules: Rules) -> Session {
    let level = LevelData::from_rows(1, 50, &ALL_RED, &[(ItemKind::Red, 1_000)]);
    let mut session = Session::new(rules, LevelCatalog::from_levels([level])).unwrap();
    session.start_level(1).unwrap();
    session
}

fn bench_flood_fill(c: &mut Criterion) {
    let mut grid = Grid::new(8, 9, 1, 1);
    for pos in grid.visible_cells().collect::<Vec<_>>() {
        grid.spawn(ItemKind::Red, pos, 0);
    }
    let resolver = MatchResolver::new(&Rules::default());

    c.bench_function("flood_fill_8x9", |b| {
        b.iter(|| resolver.find_group(black_box(&grid), CellPos::new(4, 4)).len())
    });
}

fn bench_full_cascade(c: &mut Criterion) {
    c.bench_function("clear_and_cascade_8x9", |b| {
        b.iter_batched(
            || red_session(Rules::instant()),
            |mut session| {
                session.tap(0, 0);
                while session.is_busy() {
                    session.tick(TICK_MS);
                }
                session
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_rocket_line(c: &mut Criterion) {
    c.bench_function("rocket_tap_and_settle", |b| {
        b.iter_batched(
            || {
                let mut session = red_session(Rules::instant());
                session.tap(4, 4);
                while session.is_busy() {
                    session.tick(TICK_MS);
                }
                session
            },
            |mut session| {
                let rocket = session
                    .grid()
                    .visible_cells()
                    .find(|pos| session.grid().kind_at(*pos).is_some_and(|k| k.is_rocket()));
                if let Some(pos) = rocket {
                    session.tap(pos.x, pos.y);
                }
                while session.is_busy() {
                    session.tick(TICK_MS);
                }
                session
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let session = red_session(Rules::default());
    let mut snap = SessionSnapshot::default();

    c.bench_function("snapshot_into", |b| {
        b.iter(|| {
            session.snapshot_into(black_box(&mut snap));
        })
    });
}

criterion_group!(
    benches,
    bench_flood_fill,
    bench_full_cascade,
    bench_rocket_line,
    bench_snapshot
);
criterion_main!(benches);
