//! Splits long path lists so each git invocation stays under the platform
//! command-line ceiling.

/// Maximum combined character length of the paths passed to a single git call
pub const MAX_CLI_LENGTH: usize = 30_000;

/// Split `values` into consecutive batches whose combined length does not
/// exceed `max_chunk_length`.
///
/// Order is preserved and every value lands in exactly one batch. A single
/// value longer than the limit gets a batch of its own.
pub fn split_in_chunks<S: AsRef<str>>(values: &[S], max_chunk_length: usize) -> Vec<Vec<&str>> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut length = 0;

    for value in values {
        let value = value.as_ref();
        let mut new_length = length + value.len();

        if new_length > max_chunk_length && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            new_length = value.len();
        }

        current.push(value);
        length = new_length;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        let values: Vec<String> = Vec::new();
        assert!(split_in_chunks(&values, 10).is_empty());
    }

    #[test]
    fn test_fits_in_one_chunk() {
        let chunks = split_in_chunks(&["a", "b", "c"], 10);
        assert_eq!(chunks, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_splits_by_length_not_count() {
        let chunks = split_in_chunks(&["aaaa", "bbbb", "c", "dddd"], 8);
        assert_eq!(chunks, vec![vec!["aaaa", "bbbb"], vec!["c", "dddd"]]);
    }

    #[test]
    fn test_oversized_value_gets_own_chunk() {
        let chunks = split_in_chunks(&["a", "0123456789", "b"], 5);
        assert_eq!(chunks, vec![vec!["a"], vec!["0123456789"], vec!["b"]]);
    }

    #[test]
    fn test_ten_thousand_paths() {
        let paths: Vec<String> = (0..10_000)
            .map(|i| format!("src/some/deeply/nested/dir/file_{i:05}.rs"))
            .collect();
        let total: usize = paths.iter().map(String::len).sum();
        assert!(total > MAX_CLI_LENGTH);

        let chunks = split_in_chunks(&paths, MAX_CLI_LENGTH);

        assert!(chunks.len() >= total.div_ceil(MAX_CLI_LENGTH));
        for chunk in &chunks {
            let len: usize = chunk.iter().map(|p| p.len()).sum();
            assert!(len <= MAX_CLI_LENGTH);
        }
        let flattened: Vec<&str> = chunks.into_iter().flatten().collect();
        let expected: Vec<&str> = paths.iter().map(String::as_str).collect();
        assert_eq!(flattened, expected);
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_input_once(
            values in prop::collection::vec("[a-z/]{1,40}", 0..200),
            limit in 1usize..400,
        ) {
            let chunks = split_in_chunks(&values, limit);

            for chunk in &chunks {
                prop_assert!(!chunk.is_empty());
                let len: usize = chunk.iter().map(|v| v.len()).sum();
                prop_assert!(len <= limit || chunk.len() == 1);
            }

            let flattened: Vec<&str> = chunks.into_iter().flatten().collect();
            let expected: Vec<&str> = values.iter().map(String::as_str).collect();
            prop_assert_eq!(flattened, expected);
        }
    }
}
