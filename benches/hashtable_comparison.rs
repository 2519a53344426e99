use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;
use std::collections::VecDeque;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use lin_hash::HashTable as LinHashTable;
use lin_hash::hash_table::Entry as LinEntry;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

trait KeyValuePair: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

#[derive(Clone)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct StringTestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for StringTestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

const SIZES: &[usize] = &[(1 << 10), (1 << 12), (1 << 14), (1 << 16), (1 << 18)];

/// Number of elements that fill a table created for `size` without growing.
fn fill_count<TestItem: KeyValuePair>(size: usize) -> usize {
    let table = LinHashTable::<TestItem>::with_capacity(size);
    table.growth_left()
}

fn random_items<TestItem: KeyValuePair>(count: usize) -> Vec<(u64, TestItem)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let item = TestItem::new(rng.try_next_u64().unwrap());
            (item.hash_key(), item)
        })
        .collect()
}

fn bench_insert_random<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count::<TestItem>(*size);
        let hash_and_item = random_items::<TestItem>(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_function("lin_hash", |b| {
            b.iter_batched(
                || hash_and_item.clone(),
                |hash_and_item| {
                    let mut table = LinHashTable::<TestItem>::with_capacity(0);
                    for (hash, item) in hash_and_item {
                        match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
                            LinEntry::Vacant(entry) => {
                                black_box(entry.insert(item));
                            }
                            LinEntry::Occupied(_) => unreachable!(),
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || hash_and_item.clone(),
                |hash_and_item| {
                    let mut table = HashbrownHashTable::with_capacity(0);
                    for (hash, item) in hash_and_item {
                        match table.entry(hash, |v: &TestItem| v.eq_key(&item), |v| v.hash_key()) {
                            HashbrownEntry::Vacant(entry) => {
                                black_box(entry.insert(item));
                            }
                            HashbrownEntry::Occupied(_) => unreachable!(),
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count::<TestItem>(*size);
        let present = random_items::<TestItem>(count);
        let absent = random_items::<TestItem>(count);

        let mut probes = present.iter().chain(absent.iter()).cloned().collect::<Vec<_>>();
        probes.shuffle(&mut SmallRng::from_os_rng());

        let mut lin_table = LinHashTable::<TestItem>::with_capacity(*size);
        let mut hashbrown_table = HashbrownHashTable::<TestItem>::with_capacity(*size);
        for (hash, item) in present.iter() {
            lin_table.insert(*hash, item.clone(), |v| v.eq_key(item), |v| v.hash_key());
            hashbrown_table.insert_unique(*hash, item.clone(), |v| v.hash_key());
        }

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function("lin_hash", |b| {
            b.iter(|| {
                for (hash, item) in probes.iter() {
                    black_box(lin_table.get(*hash, |v| v.eq_key(item)));
                }
            })
        });

        group.bench_function("hashbrown", |b| {
            b.iter(|| {
                for (hash, item) in probes.iter() {
                    black_box(hashbrown_table.find(*hash, |v| v.eq_key(item)));
                }
            })
        });
    }

    group.finish();
}

/// Erase the oldest element and insert a fresh one, keeping the table at its
/// growth budget. Exercises tombstone reuse and same-size rebuilds.
fn bench_sliding_window<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "sliding_window_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let window = fill_count::<TestItem>(*size);
        let stream = (0..window as u64 * 4)
            .map(|key| {
                let item = TestItem::new(key);
                (item.hash_key(), item)
            })
            .collect::<Vec<_>>();
        let cycles = stream.len() - window;

        group.throughput(Throughput::Elements(cycles as u64 * 2));
        group.bench_function("lin_hash", |b| {
            b.iter_batched(
                || stream.clone(),
                |stream| {
                    let mut table = LinHashTable::<TestItem>::with_capacity(*size);
                    let mut live = VecDeque::with_capacity(window);
                    for (hash, item) in stream {
                        if live.len() == window {
                            let (old_hash, old_item): (u64, TestItem) = live.pop_front().unwrap();
                            black_box(table.erase(old_hash, |v| v.eq_key(&old_item)));
                        }
                        live.push_back((hash, item.clone()));
                        table.insert(hash, item, |v| v.eq_key(&live.back().unwrap().1), |v| v.hash_key());
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || stream.clone(),
                |stream| {
                    let mut table = HashbrownHashTable::<TestItem>::with_capacity(*size);
                    let mut live = VecDeque::with_capacity(window);
                    for (hash, item) in stream {
                        if live.len() == window {
                            let (old_hash, old_item): (u64, TestItem) = live.pop_front().unwrap();
                            if let Ok(entry) = table.find_entry(old_hash, |v| v.eq_key(&old_item)) {
                                black_box(entry.remove().0);
                            }
                        }
                        live.push_back((hash, item.clone()));
                        table.insert_unique(hash, item, |v| v.hash_key());
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Remove,
    Find,
}

fn bench_mixed_probabilistic_zipf<TestItem: KeyValuePair, const MAX_SIZE: usize>(
    c: &mut Criterion,
) {
    for exponent in [1.0, 1.3] {
        let mut group = c.benchmark_group(format!(
            "mixed_probabilistic_zipf_{:.01}_{}",
            exponent,
            core::any::type_name::<TestItem>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        for size in SIZES[..=MAX_SIZE].iter() {
            let count = fill_count::<TestItem>(*size);
            let mut rng = SmallRng::from_os_rng();

            let op_distr = Zipf::new(3.0, exponent).unwrap();
            let operations = (0..count * 3)
                .map(|_| {
                    let op_choice: f64 = rng.sample(op_distr);
                    if op_choice <= 1.0 {
                        Operation::Find
                    } else if op_choice <= 2.0 {
                        Operation::Insert
                    } else {
                        Operation::Remove
                    }
                })
                .collect::<Vec<Operation>>();

            // Keys drawn from twice the table's key space so finds and removes
            // miss about half the time.
            let key_distr = Zipf::new(count as f64 * 2.0 - 1.0, 1.0).unwrap();
            let workload = operations
                .into_iter()
                .map(|op| {
                    let item = TestItem::new(rng.sample(key_distr) as u64);
                    (op, item.hash_key(), item)
                })
                .collect::<Vec<_>>();

            group.throughput(Throughput::Elements(workload.len() as u64));
            group.bench_function("lin_hash", |b| {
                b.iter_batched(
                    || workload.clone(),
                    |workload| {
                        let mut table = LinHashTable::<TestItem>::with_capacity(0);
                        for (operation, hash, item) in workload {
                            match operation {
                                Operation::Insert => {
                                    match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
                                        LinEntry::Vacant(entry) => {
                                            black_box(entry.insert(item));
                                        }
                                        LinEntry::Occupied(mut occupied) => {
                                            *occupied.get_mut() = item;
                                        }
                                    }
                                }
                                Operation::Remove => {
                                    black_box(table.remove(hash, |v| v.eq_key(&item)));
                                }
                                Operation::Find => {
                                    black_box(table.find(hash, |v| v.eq_key(&item)));
                                }
                            }
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });

            group.bench_function("hashbrown", |b| {
                b.iter_batched(
                    || workload.clone(),
                    |workload| {
                        let mut table = HashbrownHashTable::<TestItem>::with_capacity(0);
                        for (operation, hash, item) in workload {
                            match operation {
                                Operation::Insert => {
                                    match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
                                        HashbrownEntry::Vacant(entry) => {
                                            black_box(entry.insert(item));
                                        }
                                        HashbrownEntry::Occupied(mut occupied) => {
                                            *occupied.get_mut() = item;
                                        }
                                    }
                                }
                                Operation::Remove => {
                                    let result = match table.find_entry(hash, |v| v.eq_key(&item)) {
                                        Ok(entry) => Some(entry.remove().0),
                                        Err(_) => None,
                                    };
                                    black_box(result);
                                }
                                Operation::Find => {
                                    black_box(table.find(hash, |v| v.eq_key(&item)));
                                }
                            }
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });
        }

        group.finish();
    }
}

fn bench_iteration<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("iteration_{}", core::any::type_name::<TestItem>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count::<TestItem>(*size);
        let hash_and_item = random_items::<TestItem>(count);

        let mut lin_table = LinHashTable::<TestItem>::with_capacity(*size);
        let mut hashbrown_table = HashbrownHashTable::<TestItem>::with_capacity(*size);
        for (hash, item) in hash_and_item.iter() {
            lin_table.insert(*hash, item.clone(), |v| v.eq_key(item), |v| v.hash_key());
            hashbrown_table.insert_unique(*hash, item.clone(), |v| v.hash_key());
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_function("lin_hash", |b| {
            b.iter(|| {
                for item in lin_table.iter() {
                    black_box(item);
                }
            })
        });

        group.bench_function("hashbrown", |b| {
            b.iter(|| {
                for item in hashbrown_table.iter() {
                    black_box(item);
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallTestItem, 4>,
    bench_insert_random::<StringTestItem, 4>,
    bench_find_hit_miss::<SmallTestItem, 4>,
    bench_find_hit_miss::<StringTestItem, 4>,
    bench_sliding_window::<SmallTestItem, 3>,
    bench_sliding_window::<StringTestItem, 3>,
    bench_mixed_probabilistic_zipf::<SmallTestItem, 4>,
    bench_mixed_probabilistic_zipf::<StringTestItem, 4>,
    bench_iteration::<SmallTestItem, 4>,
    bench_iteration::<StringTestItem, 4>,
);

criterion_main!(benches);
