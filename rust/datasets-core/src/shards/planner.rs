// rust/datasets-core/src/shards/planner.rs

use std::ops::Range;

use crate::error::{DatasetError, Result};

/// How a split should be divided into shards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardingParams {
    /// Exact number of shards. Takes precedence over `max_shard_size`.
    pub num_shards: Option<u32>,
    /// Byte budget per shard, used when `num_shards` is absent.
    pub max_shard_size: Option<u64>,
}

impl ShardingParams {
    pub fn num_shards(num_shards: u32) -> Self {
        Self {
            num_shards: Some(num_shards),
            max_shard_size: None,
        }
    }

    pub fn max_shard_size(max_shard_size: u64) -> Self {
        Self {
            num_shards: None,
            max_shard_size: Some(max_shard_size),
        }
    }
}

/// A contiguous row range of a split destined for one shard file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRange {
    /// 0-based position of this shard within the split.
    pub index: u32,
    /// Number of shards in the split.
    pub total: u32,
    /// First row of the shard.
    pub offset: usize,
    /// Number of rows in the shard.
    pub len: usize,
}

impl ShardRange {
    pub fn rows(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Resolves the number of shards for a split.
///
/// # Errors
///
/// Returns a configuration error if the shard count is zero, the byte
/// budget is zero, or only a byte budget is given for a dataset whose size
/// is unknown.
pub fn resolve_num_shards(estimated_bytes: Option<u64>, params: &ShardingParams) -> Result<u32> {
    if let Some(num_shards) = params.num_shards {
        if num_shards == 0 {
            return Err(DatasetError::config("num_shards must be greater than 0"));
        }
        return Ok(num_shards);
    }

    let max_shard_size = params.max_shard_size.ok_or_else(|| {
        DatasetError::config("either num_shards or max_shard_size must be given")
    })?;
    if max_shard_size == 0 {
        return Err(DatasetError::config("max_shard_size must be greater than 0"));
    }

    let total = estimated_bytes.ok_or_else(|| {
        DatasetError::config(
            "dataset size cannot be estimated; pass num_shards explicitly",
        )
    })?;

    let shards = total.div_ceil(max_shard_size).max(1);
    u32::try_from(shards).map_err(|_| {
        DatasetError::config(format!(
            "{total} bytes with max_shard_size {max_shard_size} needs too many shards"
        ))
    })
}

/// Divides `num_rows` rows into contiguous shards.
///
/// Every shard gets `num_rows / num_shards` rows and the last shard absorbs
/// the remainder, so concatenating the ranges in index order covers
/// `0..num_rows` exactly once. At least one range is always produced; an
/// empty dataset yields a single empty shard.
pub fn plan_shards(
    num_rows: usize,
    estimated_bytes: Option<u64>,
    params: &ShardingParams,
) -> Result<Vec<ShardRange>> {
    let total = resolve_num_shards(estimated_bytes, params)?;
    let per_shard = num_rows / total as usize;

    let shards = (0..total)
        .map(|index| {
            let offset = index as usize * per_shard;
            let len = if index == total - 1 {
                num_rows - offset
            } else {
                per_shard
            };
            ShardRange {
                index,
                total,
                offset,
                len,
            }
        })
        .collect();

    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(shards: &[ShardRange], num_rows: usize) {
        assert_eq!(shards[0].offset, 0);
        for pair in shards.windows(2) {
            assert_eq!(pair[0].offset + pair[0].len, pair[1].offset, "gap between shards");
        }
        let last = shards.last().unwrap();
        assert_eq!(last.offset + last.len, num_rows);
        assert_eq!(shards.iter().map(|s| s.len).sum::<usize>(), num_rows);
    }

    #[test]
    fn test_plan_even_split() {
        let shards = plan_shards(100, None, &ShardingParams::num_shards(2)).unwrap();

        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].rows(), 0..50);
        assert_eq!(shards[1].rows(), 50..100);
        assert_covers(&shards, 100);
    }

    #[test]
    fn test_last_shard_absorbs_remainder() {
        let shards = plan_shards(10, None, &ShardingParams::num_shards(3)).unwrap();

        let lens: Vec<usize> = shards.iter().map(|s| s.len).collect();
        assert_eq!(lens, vec![3, 3, 4]);
        assert_covers(&shards, 10);
    }

    #[test]
    fn test_more_shards_than_rows_keeps_count() {
        let shards = plan_shards(2, None, &ShardingParams::num_shards(5)).unwrap();

        assert_eq!(shards.len(), 5);
        assert_covers(&shards, 2);
        assert_eq!(shards[4].len, 2);
    }

    #[test]
    fn test_empty_dataset_gets_one_empty_shard() {
        let shards = plan_shards(0, Some(0), &ShardingParams::max_shard_size(1024)).unwrap();

        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0], ShardRange { index: 0, total: 1, offset: 0, len: 0 });
    }

    #[test]
    fn test_indices_and_totals() {
        let shards = plan_shards(40, None, &ShardingParams::num_shards(4)).unwrap();

        for (i, shard) in shards.iter().enumerate() {
            assert_eq!(shard.index, i as u32);
            assert_eq!(shard.total, 4);
        }
    }

    #[test]
    fn test_byte_budget_rounds_up() {
        let params = ShardingParams::max_shard_size(100);

        assert_eq!(resolve_num_shards(Some(250), &params).unwrap(), 3);
        assert_eq!(resolve_num_shards(Some(300), &params).unwrap(), 3);
        assert_eq!(resolve_num_shards(Some(1), &params).unwrap(), 1);
        assert_eq!(resolve_num_shards(Some(0), &params).unwrap(), 1);
    }

    #[test]
    fn test_num_shards_wins_over_budget() {
        let params = ShardingParams {
            num_shards: Some(7),
            max_shard_size: Some(1),
        };
        assert_eq!(resolve_num_shards(Some(1_000_000), &params).unwrap(), 7);
        assert_eq!(resolve_num_shards(None, &params).unwrap(), 7);
    }

    #[test]
    fn test_configuration_errors() {
        let unknown_size = resolve_num_shards(None, &ShardingParams::max_shard_size(100));
        assert!(matches!(unknown_size, Err(DatasetError::Config { .. })));

        let nothing = resolve_num_shards(Some(10), &ShardingParams::default());
        assert!(matches!(nothing, Err(DatasetError::Config { .. })));

        let zero = resolve_num_shards(Some(10), &ShardingParams::num_shards(0));
        assert!(matches!(zero, Err(DatasetError::Config { .. })));

        let zero_budget = resolve_num_shards(Some(10), &ShardingParams::max_shard_size(0));
        assert!(matches!(zero_budget, Err(DatasetError::Config { .. })));
    }
}
