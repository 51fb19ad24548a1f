// Criterion benchmarks for the BloodLink engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bloodlink_engine::core::{
    haversine_distance, Availability, DonorMatcher, DonorQuery, HospitalMatcher, HospitalQuery,
    HospitalSort, MatchPolicy,
};
use bloodlink_engine::models::{BloodGroup, Component, Donor, Hospital, HospitalStock};
use chrono::NaiveDate;
use uuid::Uuid;

fn create_donor(id: usize, lat: f64, lon: f64) -> Donor {
    Donor {
        donor_id: id.to_string(),
        name: format!("Donor {}", id),
        email: None,
        phone: Some("+910000000000".to_string()),
        blood_group: if id % 4 == 0 {
            BloodGroup::ONeg
        } else {
            BloodGroup::APos
        },
        location: Some("Chennai".to_string()),
        latitude: if id % 7 == 0 { None } else { Some(lat) },
        longitude: if id % 7 == 0 { None } else { Some(lon) },
        eligibility_status: Some(if id % 3 == 0 {
            "deferred_56d".to_string()
        } else {
            "eligible".to_string()
        }),
        last_donation_date: None,
        donation_count: Some((id % 20) as i64),
    }
}

fn create_hospital(id: usize, lat: f64, lon: f64) -> Hospital {
    Hospital {
        id: Uuid::new_v4(),
        name: format!("Hospital {}", id),
        address: "Chennai".to_string(),
        contact: None,
        verified: id % 2 == 0,
        latitude: Some(lat),
        longitude: Some(lon),
        stock: vec![
            HospitalStock {
                component: Component::RedCells,
                blood_group: BloodGroup::APos,
                units: (id % 15) as i32,
                freshness_days: (id % 50) as i32,
            },
            HospitalStock {
                component: Component::Platelets,
                blood_group: BloodGroup::APos,
                units: (id % 5) as i32,
                freshness_days: (id % 8) as i32,
            },
        ],
    }
}

fn donor_query() -> DonorQuery {
    DonorQuery {
        blood_group: BloodGroup::APos,
        origin: Some((13.0827, 80.2707)),
        radius_km: 50.0,
        availability: Availability::Now,
        exclude_donor_ids: vec![],
        today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
    }
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(13.0827),
                black_box(80.2707),
                black_box(12.9716),
                black_box(77.5946),
            )
        });
    });
}

fn bench_donor_ranking(c: &mut Criterion) {
    let matcher = DonorMatcher::new(MatchPolicy::Exact, 90);
    let query = donor_query();

    let mut group = c.benchmark_group("donor_ranking");

    for candidate_count in [10, 50, 100, 500, 1000].iter() {
        let candidates: Vec<Donor> = (0..*candidate_count)
            .map(|i| {
                let lat_offset = (i as f64 * 0.001) % 0.5;
                let lon_offset = (i as f64 * 0.001) % 0.5;
                create_donor(i, 13.0827 + lat_offset, 80.2707 + lon_offset)
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(candidate_count),
            candidate_count,
            |b, _| {
                b.iter_batched(
                    || candidates.clone(),
                    |candidates| matcher.rank(black_box(&query), candidates),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_hospital_ranking(c: &mut Criterion) {
    let matcher = HospitalMatcher::new(MatchPolicy::Exact, Default::default());
    let query = HospitalQuery {
        blood_group: Some(BloodGroup::APos),
        component: Some(Component::RedCells),
        location: None,
        origin: Some((13.0827, 80.2707)),
        radius_km: Some(100.0),
        min_units: 2,
        sort: HospitalSort::Distance,
    };

    let hospitals: Vec<Hospital> = (0..200)
        .map(|i| {
            let lat_offset = (i as f64 * 0.002) % 0.8;
            create_hospital(i, 13.0827 + lat_offset, 80.2707 + lat_offset)
        })
        .collect();

    c.bench_function("hospital_ranking_200", |b| {
        b.iter_batched(
            || hospitals.clone(),
            |hospitals| matcher.rank(black_box(&query), hospitals),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_donor_ranking,
    bench_hospital_ranking
);
criterion_main!(benches);
