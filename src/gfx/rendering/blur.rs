//! Ping-pong Gaussian blur schedule
//!
//! The bright-pass target is blurred by alternating horizontal and vertical
//! passes between two ping-pong targets. The schedule is pure data so the
//! render engine only has to walk it.

/// Texture a blur pass samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloomTarget {
    Bright,
    PingPong(usize),
}

/// One fullscreen blur pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurPass {
    pub source: BloomTarget,
    /// Ping-pong index written by this pass
    pub target: usize,
    pub horizontal: bool,
}

/// Passes for `amount` blur iterations
///
/// Pass `i` writes ping-pong `i % 2`, horizontally on odd passes. The first
/// pass reads the bright target, every later pass reads what the previous
/// one wrote.
pub fn blur_schedule(amount: u32) -> Vec<BlurPass> {
    (0..amount as usize)
        .map(|i| {
            let target = i % 2;
            BlurPass {
                source: if i == 0 {
                    BloomTarget::Bright
                } else {
                    BloomTarget::PingPong((target + 1) % 2)
                },
                target,
                horizontal: target == 1,
            }
        })
        .collect()
}

/// Texture the composite pass reads as bloom after `amount` passes
///
/// With no passes the unblurred bright target is used.
pub fn bloom_source(amount: u32) -> BloomTarget {
    if amount == 0 {
        BloomTarget::Bright
    } else {
        BloomTarget::PingPong(((amount % 2 + 1) % 2) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pass_reads_bright() {
        let passes = blur_schedule(3);
        assert_eq!(
            passes[0],
            BlurPass {
                source: BloomTarget::Bright,
                target: 0,
                horizontal: false
            }
        );
        assert!(passes[1..]
            .iter()
            .all(|p| p.source != BloomTarget::Bright));
    }

    #[test]
    fn test_passes_alternate_and_chain() {
        let passes = blur_schedule(10);
        assert_eq!(passes.len(), 10);
        for (i, pass) in passes.iter().enumerate() {
            assert_eq!(pass.target, i % 2);
            assert_eq!(pass.horizontal, i % 2 == 1);
            if i > 0 {
                assert_eq!(pass.source, BloomTarget::PingPong(passes[i - 1].target));
            }
        }
    }

    #[test]
    fn test_bloom_source_is_last_written_target() {
        for amount in 1..=12 {
            let last = *blur_schedule(amount).last().unwrap();
            assert_eq!(bloom_source(amount), BloomTarget::PingPong(last.target));
        }
        assert_eq!(bloom_source(10), BloomTarget::PingPong(1));
        assert_eq!(bloom_source(1), BloomTarget::PingPong(0));
    }

    #[test]
    fn test_zero_passes_uses_bright() {
        assert!(blur_schedule(0).is_empty());
        assert_eq!(bloom_source(0), BloomTarget::Bright);
    }
}
