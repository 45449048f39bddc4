//! Benchmark for the status page parser
//!
//! A full 124T status page with every slot, drive, mailslot and picker

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tape_bulk_eject::parse_inventory;

fn full_status_page() -> String {
    let mut page = String::from(
        "<html><head><title>124T</title>\n<script>function from_to(x) { return x < 1; }</script>\n\
         </head><body><!-- status -->\n<a href=\"index.html\"><img src=\"logo.gif\"></a>\n<center>\n",
    );
    for slot in 1..=16 {
        let title = if slot % 4 == 0 {
            "Empty".to_string()
        } else {
            format!("A{:05}L3", slot)
        };
        page.push_str(&format!(
            "<img src=\"tape.gif\" title=\"{}\" onclick=\"from_to(slot{})\" />\n",
            title, slot
        ));
    }
    page.push_str("<IMG SRC=drive.gif TITLE=\"B00001L3\" ONCLICK=\"from_to(drive)\">\n");
    page.push_str("<img src=\"mail.gif\" title=\"Empty\" onclick=\"from_to(mailslot)\">\n");
    page.push_str("<img src=\"picker.gif\" title=\"Empty\" onclick=\"from_to(picker)\">\n");
    page.push_str("</center><p>&copy; Dell</p></body></html>");
    page
}

fn bench_parse_status_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("inventory_parser");
    let page = full_status_page();
    group.throughput(Throughput::Bytes(page.len() as u64));

    group.bench_function("parse_full_status_page", |b| {
        b.iter(|| {
            let _ = parse_inventory(black_box(&page));
        });
    });

    group.finish();
}

fn bench_parse_large_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("inventory_parser");

    // Capped body size with a long header before the slot region
    let mut page = "<p>padding</p>\n".repeat(6000);
    page.push_str(&full_status_page());
    group.throughput(Throughput::Bytes(page.len() as u64));

    group.bench_function("parse_padded_status_page", |b| {
        b.iter(|| {
            let _ = parse_inventory(black_box(&page));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse_status_page, bench_parse_large_page);
criterion_main!(benches);
