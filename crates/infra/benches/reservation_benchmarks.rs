use std::sync::Arc;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use storefront_catalog::{LineRequest, Product, ProductDetails};
use storefront_core::{Money, ProductId, Quantity, UserId};
use storefront_infra::cart_store::{CartStore, InMemoryCartStore};
use storefront_infra::catalog_store::{CatalogStore, InMemoryCatalogStore};
use storefront_infra::order_ledger::InMemoryOrderLedger;
use storefront_infra::{CheckoutService, EventPublisher, StockReservation};
use storefront_orders::ShippingDetails;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn seed_catalog(rt: &Runtime, products: usize, stock: u32) -> (Arc<InMemoryCatalogStore>, Vec<ProductId>) {
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let ids = rt.block_on(async {
        let mut ids = Vec::with_capacity(products);
        for i in 0..products {
            let product = Product::create(
                ProductId::new(),
                ProductDetails {
                    name: format!("item-{i}"),
                    description: String::new(),
                    category: String::new(),
                    price: Money::from_minor(999).unwrap(),
                },
                stock,
                Utc::now(),
            )
            .unwrap();
            ids.push(product.id());
            catalog.insert(product).await.unwrap();
        }
        ids
    });
    (catalog, ids)
}

/// Reserve-then-release round trips for carts of increasing size.
fn bench_reservation_by_cart_size(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("reservation_by_cart_size");

    for lines in [1usize, 5, 20].iter() {
        let (catalog, ids) = seed_catalog(&rt, *lines, u32::MAX / 2);
        let reservation = StockReservation::new(catalog);
        let requests: Vec<LineRequest> = ids.iter().map(|id| LineRequest::new(*id, 1)).collect();

        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &requests, |b, requests| {
            b.iter(|| {
                rt.block_on(async {
                    let reserved = reservation.reserve(black_box(requests)).await.unwrap();
                    reservation.release(reserved.lines()).await
                })
            });
        });
    }

    group.finish();
}

/// Concurrent buyers contending on one hot product.
fn bench_contended_reservation(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("contended_reservation");
    group.sample_size(20);

    for buyers in [8usize, 64].iter() {
        group.throughput(Throughput::Elements(*buyers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(buyers), buyers, |b, &buyers| {
            b.iter(|| {
                let (catalog, ids) = seed_catalog(&rt, 1, (buyers / 2) as u32);
                let reservation = StockReservation::new(catalog);
                let hot = ids[0];
                rt.block_on(async {
                    let handles: Vec<_> = (0..buyers)
                        .map(|_| {
                            let reservation = reservation.clone();
                            tokio::spawn(async move { reservation.reserve(&[LineRequest::new(hot, 1)]).await.is_ok() })
                        })
                        .collect();
                    let mut won = 0;
                    for handle in handles {
                        if handle.await.unwrap() {
                            won += 1;
                        }
                    }
                    assert_eq!(won, buyers / 2);
                })
            });
        });
    }

    group.finish();
}

/// Full checkout: cart load, reservation, order write, cart clear.
fn bench_checkout(c: &mut Criterion) {
    let rt = runtime();
    let (catalog, ids) = seed_catalog(&rt, 3, u32::MAX / 2);
    let carts = Arc::new(InMemoryCartStore::new());
    let service = CheckoutService::new(
        catalog,
        carts.clone(),
        Arc::new(InMemoryOrderLedger::new()),
        EventPublisher::default(),
    );

    c.bench_function("checkout_three_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let user = UserId::new();
                for id in &ids {
                    carts
                        .add_line(user, *id, Quantity::new(1).unwrap())
                        .await
                        .unwrap();
                }
                service.checkout(user, ShippingDetails::default()).await.unwrap()
            })
        });
    });
}

criterion_group!(
    benches,
    bench_reservation_by_cart_size,
    bench_contended_reservation,
    bench_checkout
);
criterion_main!(benches);
