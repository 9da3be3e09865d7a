use std::env;
use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use tablesieve_core::table::{BBox, CharObj, Page, RectObj, TableFinder, TableSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BenchTier {
    Quick,
    Full,
}

fn bench_tier() -> BenchTier {
    match env::var("TABLESIEVE_BENCH_TIER").as_deref() {
        Ok("full") => BenchTier::Full,
        _ => BenchTier::Quick,
    }
}

/// A page holding `tables` ruled 6x4 grids stacked down the page, each
/// cell with a short number in it.
fn synthetic_page(tables: usize) -> Page {
    let height = 40.0 + tables as f64 * 140.0;
    let mut page = Page::new(BBox::new(0.0, 0.0, 600.0, height));
    for t in 0..tables {
        let y = 40.0 + t as f64 * 140.0;
        for r in 0..6 {
            for c in 0..4 {
                let cell = BBox::new(
                    100.0 + c as f64 * 90.0,
                    y + r as f64 * 20.0,
                    190.0 + c as f64 * 90.0,
                    y + (r + 1) as f64 * 20.0,
                );
                page.add_rect(RectObj::new(cell));
                for (i, ch) in format!("{}", 1000 + r * 37 + c * 11).chars().enumerate() {
                    let x0 = cell.x0 + 2.0 + i as f64 * 5.0;
                    page.add_char(CharObj::new(
                        &ch.to_string(),
                        BBox::new(x0, cell.top + 4.0, x0 + 5.0, cell.top + 14.0),
                        10.0,
                    ));
                }
            }
        }
    }
    page
}

fn bench_find_tables(c: &mut Criterion) {
    let (sample_size, measurement) = match bench_tier() {
        BenchTier::Quick => (20, Duration::from_secs(3)),
        BenchTier::Full => (30, Duration::from_secs(5)),
    };
    let finder = TableFinder::new(TableSettings::default()).expect("default settings are valid");

    let mut group = c.benchmark_group("find_tables");
    group.sample_size(sample_size);
    group.measurement_time(measurement);

    for tables in [1usize, 8, 32] {
        let page = synthetic_page(tables);
        group.throughput(Throughput::Elements(page.rects.len() as u64));
        group.bench_with_input(BenchmarkId::new("page", tables), &page, |b, page| {
            b.iter(|| black_box(finder.find_tables(page).len()))
        });
    }

    let pages: Vec<Page> = (0..16).map(|_| synthetic_page(4)).collect();
    group.bench_with_input(BenchmarkId::new("pages", pages.len()), &pages, |b, pages| {
        b.iter(|| black_box(finder.find_tables_in_pages(pages).len()))
    });

    group.finish();
}

criterion_group!(table_benches, bench_find_tables);
criterion_main!(table_benches);
