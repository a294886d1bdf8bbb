mod common;

use std::sync::Arc;
use std::thread;

use arrow::datatypes::DataType;
use common::{RecordingFilters, SEED, filter_admitting, filter_rejecting_all};
use splitscan_runtime::RuntimeFilterRegistry;
use splitscan_scan::{PartitionDescriptor, PartitionFilterEvaluator};
use splitscan_types::{FileFormat, Literal, TupleDescriptor};

fn three_key_desc() -> Arc<TupleDescriptor> {
    Arc::new(
        TupleDescriptor::builder(0)
            .slot(1, 0, DataType::Int32)
            .slot(2, 1, DataType::Utf8)
            .slot(3, 2, DataType::Int64)
            .build()
            .unwrap(),
    )
}

fn three_key_partition() -> PartitionDescriptor {
    PartitionDescriptor::new(7, FileFormat::Parquet).with_key_values([
        Literal::from(2024),
        Literal::from("emea"),
        Literal::from(7i64),
    ])
}

fn admitting_all_keys() -> RuntimeFilterRegistry {
    RuntimeFilterRegistry::new(SEED)
        .with_filter(1, filter_admitting(&[Literal::from(2024)], &DataType::Int32))
        .with_filter(2, filter_admitting(&[Literal::from("emea")], &DataType::Utf8))
        .with_filter(3, filter_admitting(&[Literal::from(7i64)], &DataType::Int64))
}

#[test]
fn first_rejecting_slot_short_circuits() {
    let evaluator = PartitionFilterEvaluator::new(three_key_desc());
    let partition = three_key_partition();
    let filters = RecordingFilters::new(
        RuntimeFilterRegistry::new(SEED)
            .with_filter(1, filter_admitting(&[Literal::from(2024)], &DataType::Int32))
            .with_filter(2, filter_rejecting_all())
            .with_filter(3, filter_admitting(&[Literal::from(7i64)], &DataType::Int64)),
    );

    assert!(evaluator.should_skip(&partition, &filters).unwrap());
    assert_eq!(filters.lookups(), vec![1, 2]);
}

#[test]
fn partition_admitted_by_every_filter_is_kept() {
    let evaluator = PartitionFilterEvaluator::new(three_key_desc());
    let partition = three_key_partition();
    let filters = RecordingFilters::new(admitting_all_keys());

    assert!(!evaluator.should_skip(&partition, &filters).unwrap());
    assert_eq!(filters.lookups(), vec![1, 2, 3]);
}

#[test]
fn materialized_non_key_column_disables_pruning() {
    let desc = Arc::new(
        TupleDescriptor::builder(0)
            .slot(1, 0, DataType::Int32)
            .slot(2, 1, DataType::Utf8)
            .slot(4, 3, DataType::Float64)
            .build()
            .unwrap(),
    );
    let evaluator = PartitionFilterEvaluator::new(desc);
    let partition = three_key_partition();
    let filters = RecordingFilters::new(
        RuntimeFilterRegistry::new(SEED)
            .with_filter(1, filter_rejecting_all())
            .with_filter(4, filter_rejecting_all()),
    );

    assert!(!evaluator.gate_passes(partition.num_partition_keys()));
    assert!(!evaluator.should_skip(&partition, &filters).unwrap());
    assert!(filters.lookups().is_empty());
    assert_eq!(partition.template().acquisitions(), 0);
}

#[test]
fn unmaterialized_non_key_column_does_not_disable_pruning() {
    let desc = Arc::new(
        TupleDescriptor::builder(0)
            .slot(1, 0, DataType::Int32)
            .unmaterialized_slot(4, 3, DataType::Float64)
            .build()
            .unwrap(),
    );
    let evaluator = PartitionFilterEvaluator::new(desc);
    let partition = three_key_partition();
    let filters = RuntimeFilterRegistry::new(SEED).with_filter(1, filter_rejecting_all());

    assert!(evaluator.should_skip(&partition, &filters).unwrap());
}

#[test]
fn no_registered_filters_leaves_template_untouched() {
    let evaluator = PartitionFilterEvaluator::new(three_key_desc());
    let partition = three_key_partition();

    let skip = evaluator
        .should_skip(&partition, &RuntimeFilterRegistry::new(SEED))
        .unwrap();

    assert!(!skip);
    assert_eq!(partition.template().acquisitions(), 0);
    assert!(partition.template().snapshot().unwrap().is_none());
}

#[test]
fn rewriting_key_values_is_idempotent() {
    let evaluator = PartitionFilterEvaluator::new(three_key_desc());
    let partition = three_key_partition();
    let filters = admitting_all_keys();

    assert!(!evaluator.should_skip(&partition, &filters).unwrap());
    let first = partition.template().snapshot().unwrap().unwrap();
    assert!(!evaluator.should_skip(&partition, &filters).unwrap());
    let second = partition.template().snapshot().unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(partition.template().acquisitions(), 2);
}

#[test]
fn concurrent_ranges_of_one_partition_agree_on_the_template() {
    let desc = three_key_desc();
    let evaluator = PartitionFilterEvaluator::new(Arc::clone(&desc));
    let partition = Arc::new(three_key_partition());
    let filters = Arc::new(admitting_all_keys());

    let results: Vec<Vec<bool>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let evaluator = evaluator.clone();
                let partition = Arc::clone(&partition);
                let filters = Arc::clone(&filters);
                scope.spawn(move || {
                    (0..200)
                        .map(|_| evaluator.should_skip(&partition, &filters).unwrap())
                        .collect::<Vec<bool>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().flatten().all(|skip| !skip));
    assert_eq!(partition.template().acquisitions(), 400);

    let reference = three_key_partition();
    evaluator.should_skip(&reference, filters.as_ref()).unwrap();
    assert_eq!(
        partition.template().snapshot().unwrap(),
        reference.template().snapshot().unwrap()
    );
}
