//! Flattening of ordered page results

/// Concatenate pages in order, keeping the order of records within each page
///
/// Empty pages (including substitutes for failed fetches) contribute nothing.
pub fn flatten<R>(pages: Vec<Vec<R>>) -> Vec<R> {
    let len = pages.iter().map(Vec::len).sum();
    let mut flat = Vec::with_capacity(len);
    for page in pages {
        flat.extend(page);
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowdump_common::Record;

    fn record(id: u64) -> Record {
        Record::new().with_field("id", id)
    }

    #[test]
    fn test_flatten_preserves_order_across_empty_pages() {
        let (r1, r2, r3) = (record(1), record(2), record(3));
        let flat = flatten(vec![vec![r1.clone(), r2.clone()], vec![], vec![r3.clone()]]);
        assert_eq!(flat, vec![r1, r2, r3]);
    }

    #[test]
    fn test_flatten_nothing() {
        assert!(flatten::<Record>(vec![]).is_empty());
        assert!(flatten::<Record>(vec![vec![], vec![]]).is_empty());
    }
}
