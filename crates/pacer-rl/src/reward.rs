//! Reward computation from throughput/RTT sample batches

use serde::{Deserialize, Serialize};

use crate::state::Reward;

/// One `throughput,rtt` measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub throughput: f64,
    pub rtt: f64,
}

impl Sample {
    /// Parse a `throughput,rtt` line. Anything other than exactly two
    /// positive finite numbers is noise.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.trim().split(',');
        let throughput = parse_positive(parts.next()?)?;
        let rtt = parse_positive(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { throughput, rtt })
    }
}

fn parse_positive(field: &str) -> Option<f64> {
    let value: f64 = field.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Parse every well-formed sample in a measurement file's contents
pub fn parse_batch(contents: &str) -> Vec<Sample> {
    contents.lines().filter_map(Sample::parse).collect()
}

/// A batch reduced to its reward and the averages behind it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardSignal {
    pub reward: Reward,
    pub avg_throughput: f64,
    pub avg_rtt: f64,
}

/// `log10(mean throughput / mean rtt)`.
///
/// Returns `None` while there is no usable signal: an empty batch, averages
/// that are not strictly positive, or a ratio too extreme to give a finite
/// reward.
pub fn compute(batch: &[Sample]) -> Option<RewardSignal> {
    if batch.is_empty() {
        return None;
    }

    // Running means stay finite for any batch of finite samples
    let mut avg_throughput = 0.0;
    let mut avg_rtt = 0.0;
    for (k, sample) in batch.iter().enumerate() {
        let k = (k + 1) as f64;
        avg_throughput += (sample.throughput - avg_throughput) / k;
        avg_rtt += (sample.rtt - avg_rtt) / k;
    }

    if avg_throughput <= 0.0 || avg_rtt <= 0.0 {
        return None;
    }

    let reward = (avg_throughput / avg_rtt).log10();
    if !reward.is_finite() {
        return None;
    }

    Some(RewardSignal {
        reward,
        avg_throughput,
        avg_rtt,
    })
}
