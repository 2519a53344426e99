use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use lin_hash::HashTable;
use lin_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Number of erase-then-insert cycles run over the filled table.
    #[arg(short = 'n', long = "churn", default_value_t = 100_000)]
    churn: u64,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);
    let capacity = table.capacity();

    println!("Actual capacity: {}", capacity);
    println!("Filling table up to its growth budget...");

    let mut window = VecDeque::new();
    let mut next = 0u64;
    while table.growth_left() > 0 {
        let value = next;
        match table.entry(hash_u64(value), |&v| v == value, |&v| hash_u64(v)) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
        window.push_back(value);
        next += 1;
    }

    println!("Inserted {} values into table", table.len());
    table.probe_histogram(|&v| hash_u64(v)).print();
    table.debug_stats(|&v| hash_u64(v)).print();

    println!();
    println!("Sliding window churn: {} cycles...", args.churn);

    let mut rebuilds = 0;
    let mut growths = 0;
    for _ in 0..args.churn {
        let oldest = window.pop_front().expect("window is never empty");
        assert!(table.erase(hash_u64(oldest), |&v| v == oldest));

        let value = next;
        let before = (table.capacity(), table.growth_left());
        table.insert(hash_u64(value), value, |&v| v == value, |&v| hash_u64(v));
        if table.capacity() != before.0 {
            growths += 1;
        } else if table.growth_left() > before.1 {
            rebuilds += 1;
        }

        window.push_back(value);
        next += 1;
    }

    println!(
        "Capacity {} -> {} ({} doublings, {} same-size rebuilds)",
        capacity,
        table.capacity(),
        growths,
        rebuilds
    );
    table.probe_histogram(|&v| hash_u64(v)).print();
    table.debug_stats(|&v| hash_u64(v)).print();
}
