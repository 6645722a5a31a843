//! Benchmarks pour la normalisation des en-têtes et la recherche de colonnes

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rgph_io::{normalize_header, Cell, Dataset};

const HEADERS: &[&str] = &[
    "Country Code",
    "Region Code",
    "Department Code",
    "Commune Code",
    "niveau_donnee",
    "Total Population",
    "Population Masculine (%)",
    "Population Féminine (%)",
    "Population 10+",
    "Taux Célibataire",
    "Taux Marié",
    "Taux Divorcé",
    "Taux Veuf",
    "Taux de Scolarisation (6-11 ans)",
    "Taux d'Analphabétisme (10+)",
    "Population 15+",
    "Taux d’Analphabétisme (15+)",
    "Aucun niveau",
    "Préscolaire",
    "Université",
];

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_header");
    group.throughput(Throughput::Elements(HEADERS.len() as u64));
    group.bench_function("census_headers", |b| {
        b.iter(|| {
            for header in HEADERS {
                black_box(normalize_header(black_box(header)));
            }
        })
    });
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut dataset = Dataset::new(HEADERS.iter().map(|h| h.to_string()).collect());
    for i in 0..1_000 {
        dataset.push_row(vec![Cell::from("MR"), Cell::from(format!("MR{:02}", i % 15 + 1))]);
    }

    c.bench_function("header_index_find_any", |b| {
        b.iter(|| {
            let index = dataset.header_index();
            black_box(index.find_any(&["Illiteracy Rate 15+", "Taux d'Analphabétisme 15+"]))
        })
    });
}

criterion_group!(benches, bench_normalize, bench_lookup);
criterion_main!(benches);
