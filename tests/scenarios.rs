use distributed_radix_sort::{sort, sort_cluster, LocalCluster, SortConfig, SortError};

fn run(partitions: Vec<Vec<u32>>) -> Vec<Vec<u32>> {
    let config = SortConfig::new(partitions.len(), partitions[0].len());
    sort_cluster(config, partitions).unwrap()
}

fn bits_of(partitions: Vec<Vec<u32>>) -> u32 {
    let config = SortConfig::new(partitions.len(), partitions[0].len());
    let outcomes = LocalCluster::new(config)
        .unwrap()
        .run(partitions, |w, tab| sort(w, tab))
        .unwrap();
    let bits = outcomes[0].bits;
    assert!(outcomes.iter().all(|o| o.bits == bits));
    bits
}

#[test]
fn four_workers_two_each() {
    let input = vec![vec![3, 1], vec![4, 1], vec![5, 9], vec![2, 6]];
    assert_eq!(bits_of(input.clone()), 4);
    assert_eq!(run(input), vec![vec![1, 1], vec![2, 3], vec![4, 5], vec![6, 9]]);
}

#[test]
fn all_equal_values_stay_put() {
    let input = vec![vec![7, 7, 7], vec![7, 7, 7]];
    assert_eq!(bits_of(input.clone()), 3);
    assert_eq!(run(input.clone()), input);
}

#[test]
fn single_bit_input() {
    let input = vec![vec![0, 0, 0, 0], vec![1, 1, 1, 1]];
    assert_eq!(bits_of(input.clone()), 1);
    assert_eq!(run(input.clone()), input);
}

#[test]
fn power_of_two_maximum_is_fully_sorted() {
    let input = vec![vec![8, 0], vec![0, 8], vec![8, 0]];
    assert_eq!(bits_of(input.clone()), 4);
    assert_eq!(run(input), vec![vec![0, 0], vec![0, 8], vec![8, 8]]);
}

#[test]
fn single_worker_is_local_radix_sort() {
    assert_eq!(run(vec![vec![12, 4, 7, 1, 9]]), vec![vec![1, 4, 7, 9, 12]]);
}

#[test]
fn one_element_per_worker() {
    assert_eq!(
        run(vec![vec![3], vec![1], vec![4], vec![1]]),
        vec![vec![1], vec![1], vec![3], vec![4]]
    );
}

#[test]
fn empty_partitions() {
    let sorted = sort_cluster(SortConfig::new(3, 0), vec![vec![]; 3]).unwrap();
    assert_eq!(sorted, vec![Vec::<u32>::new(); 3]);
}

#[test]
fn full_width_keys() {
    let input = vec![vec![u32::MAX, 0], vec![1 << 31, u32::MAX - 1], vec![1, 1 << 30]];
    assert_eq!(
        run(input),
        vec![
            vec![0, 1],
            vec![1 << 30, 1 << 31],
            vec![u32::MAX - 1, u32::MAX]
        ]
    );
}

#[test]
fn unequal_partition_is_rejected_before_sorting() {
    let err = sort_cluster(SortConfig::new(2, 2), vec![vec![1, 2], vec![3, 4, 5]]).unwrap_err();
    assert_eq!(
        err,
        SortError::LengthMismatch {
            worker: 1,
            expected: 2,
            actual: 3
        }
    );
}

#[test]
fn wrong_number_of_partitions() {
    let err = sort_cluster(SortConfig::new(3, 1), vec![vec![1], vec![2]]).unwrap_err();
    assert_eq!(err, SortError::PartitionCount { expected: 3, actual: 2 });
}
