//! # PID Drive Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use auto_lib::{
    eqpt::DriveBase,
    event::Event,
    pid_drive::{self, PidDrive},
    pose::{Axes, Pose2D},
    sim::{self, SimDriveBase},
};

const CYCLE_PERIOD_S: f64 = 0.02;

fn pid_drive_benchmark(c: &mut Criterion) {
    // ---- Build the drive and a simulated drive base ----

    let params: pid_drive::Params =
        util::params::parse(include_str!("../../params/pid_drive.toml")).unwrap();
    let sim_params = sim::Params::default();

    let mut drive = PidDrive::new(&params);
    let mut db = SimDriveBase::new(&sim_params, Pose2D::new(-36.0, 9.0, 0.0));
    let event = Event::new("bench");

    // Bench a single control cycle, starting a new move whenever the last one
    // finishes (on target or stalled against a wall)
    let mut t = 0.0;
    c.bench_function("PidDrive::update", |b| {
        b.iter(|| {
            if !drive.is_active() {
                drive
                    .set_relative_target(&db, Axes::new(24.0, 24.0, 0.0), false, Some(&event), t)
                    .unwrap();
            }

            db.periodic(t);
            drive.update(&mut db, t);
            t += CYCLE_PERIOD_S;
        })
    });

    // Bench a complete 24 in move
    c.bench_function("PidDrive::move", |b| {
        b.iter(|| {
            let mut db = SimDriveBase::new(&sim_params, Pose2D::new(-36.0, 9.0, 0.0));
            let mut drive = PidDrive::new(&params);
            let mut t = 0.0;

            drive
                .set_relative_target(&db, Axes::new(24.0, 0.0, 0.0), false, Some(&event), t)
                .unwrap();

            while drive.is_active() && t < 10.0 {
                db.periodic(t);
                drive.update(&mut db, t);
                t += CYCLE_PERIOD_S;
            }
        })
    });
}

criterion_group!(benches, pid_drive_benchmark);
criterion_main!(benches);
