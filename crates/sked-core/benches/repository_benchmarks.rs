use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sked_core::db::establish_connection;
use sked_core::models::{Frequency, NewSchedule, RepeatSpec};
use sked_core::recurrence::QueryWindow;
use sked_core::repository::{OccurrenceRepository, ScheduleRepository, SqliteRepository};
use tokio::runtime::Runtime;

const OWNER: &str = "bench";

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

async fn setup_test_repository() -> SqliteRepository {
    let pool = establish_connection("sqlite::memory:").await.unwrap();
    SqliteRepository::new(pool)
}

async fn populate_test_data(repo: &SqliteRepository, schedule_count: usize) {
    for i in 0..schedule_count {
        let start = base() + Duration::hours(i as i64 * 7);
        let mut data = NewSchedule::new(format!("Schedule {}", i), start, start + Duration::minutes(45));
        if i % 4 == 0 {
            data.tags = vec![format!("tag{}", i % 3)];
        }
        data.repeat = match i % 5 {
            0 => Some(RepeatSpec::new(Frequency::Daily)),
            1 => Some(RepeatSpec::new(Frequency::Weekly)),
            2 => Some(RepeatSpec::new(Frequency::Monthly)),
            _ => None,
        };
        repo.create_schedule(OWNER, data).await.unwrap();
    }
}

fn bench_schedule_creation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let repo = rt.block_on(setup_test_repository());

    c.bench_function("schedule_creation", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut data = NewSchedule::new("Benchmark", base(), base() + Duration::hours(1));
                data.tags = vec!["benchmark".to_string()];
                data.repeat = Some(RepeatSpec::new(Frequency::Weekly));
                black_box(repo.create_schedule(OWNER, data).await.unwrap())
            })
        })
    });
}

fn bench_list_occurrences(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let repo = rt.block_on(async {
        let repo = setup_test_repository().await;
        populate_test_data(&repo, 500).await;
        repo
    });

    let mut group = c.benchmark_group("list_occurrences");
    for days in [7, 30, 90].iter() {
        let window = QueryWindow::new(base(), base() + Duration::days(*days)).unwrap();
        group.bench_with_input(BenchmarkId::new("days", days), &window, |b, window| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(repo.list_occurrences(OWNER, *window, &[]).await.unwrap())
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_schedule_creation, bench_list_occurrences);
criterion_main!(benches);
