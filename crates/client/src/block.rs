//! Block selector encoding for `eth_getBlockByNumber` style calls.

use alloy_eips::BlockNumberOrTag;

/// Encodes a block selector into the string argument expected by the eth JSON-RPC surface.
///
/// Tags map to their fixed names. Ordinary heights are encoded as minimal big-endian hex with a
/// `0x` prefix. Tags are distinct enum variants, so a height can never be mistaken for one.
pub fn block_number_arg(block: BlockNumberOrTag) -> String {
    match block {
        BlockNumberOrTag::Latest => "latest".to_string(),
        BlockNumberOrTag::Pending => "pending".to_string(),
        BlockNumberOrTag::Finalized => "finalized".to_string(),
        BlockNumberOrTag::Safe => "safe".to_string(),
        BlockNumberOrTag::Earliest => "earliest".to_string(),
        BlockNumberOrTag::Number(number) => format!("{number:#x}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::latest(BlockNumberOrTag::Latest, "latest")]
    #[case::pending(BlockNumberOrTag::Pending, "pending")]
    #[case::finalized(BlockNumberOrTag::Finalized, "finalized")]
    #[case::safe(BlockNumberOrTag::Safe, "safe")]
    #[case::earliest(BlockNumberOrTag::Earliest, "earliest")]
    #[case::genesis(BlockNumberOrTag::Number(0), "0x0")]
    #[case::height(BlockNumberOrTag::Number(255), "0xff")]
    #[case::large(BlockNumberOrTag::Number(0x1_0000_0000), "0x100000000")]
    fn test_block_number_arg(#[case] block: BlockNumberOrTag, #[case] expected: &str) {
        assert_eq!(block_number_arg(block), expected);
    }

    #[rstest]
    #[case(BlockNumberOrTag::Latest)]
    #[case(BlockNumberOrTag::Pending)]
    #[case(BlockNumberOrTag::Finalized)]
    #[case(BlockNumberOrTag::Safe)]
    #[case(BlockNumberOrTag::Number(1))]
    #[case(BlockNumberOrTag::Number(u64::MAX))]
    fn test_selector_survives_encoding(#[case] block: BlockNumberOrTag) {
        let decoded: BlockNumberOrTag = block_number_arg(block).parse().unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_heights_never_encode_as_tags() {
        // Heights that read as -1..-4 when reinterpreted as i64 are still plain heights.
        for height in [1u64, 2, 3, 4, u64::MAX - 3, u64::MAX - 2, u64::MAX - 1, u64::MAX] {
            let arg = block_number_arg(BlockNumberOrTag::Number(height));
            assert!(arg.starts_with("0x"), "{height} encoded as {arg}");
        }
    }
}
