//! Reduction of scored threads to a single sentiment score

use super::ScoredThread;

/// Reduces scored threads to one score.
///
/// `None` means the score is undefined for these threads (nothing to
/// average, or weights that total zero).
pub trait AggregationPolicy: Send + Sync {
    fn aggregate(&self, threads: &[ScoredThread]) -> Option<f64>;
}

impl<F> AggregationPolicy for F
where
    F: Fn(&[ScoredThread]) -> Option<f64> + Send + Sync,
{
    fn aggregate(&self, threads: &[ScoredThread]) -> Option<f64> {
        self(threads)
    }
}

/// Engagement weight of a thread: `1 + score/100 + num_comments/50`
pub fn engagement_weight(score: i64, num_comments: u64) -> f64 {
    1.0 + score as f64 / 100.0 + num_comments as f64 / 50.0
}

/// Weighted mean of thread sentiments using engagement weights
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementWeighted;

impl AggregationPolicy for EngagementWeighted {
    fn aggregate(&self, threads: &[ScoredThread]) -> Option<f64> {
        let (weighted, total) = threads.iter().fold((0.0, 0.0), |(sum, total), t| {
            (sum + t.sentiment * t.weight, total + t.weight)
        });

        // Heavily downvoted threads can push the total to zero or below
        (total > 0.0).then(|| weighted / total)
    }
}

/// Plain mean over every title and comment polarity
#[derive(Debug, Clone, Copy, Default)]
pub struct UnweightedMean;

impl AggregationPolicy for UnweightedMean {
    fn aggregate(&self, threads: &[ScoredThread]) -> Option<f64> {
        let polarities: Vec<f64> = threads
            .iter()
            .flat_map(|t| std::iter::once(t.title_polarity).chain(t.comment_polarities.iter().copied()))
            .collect();

        (!polarities.is_empty()).then(|| polarities.iter().sum::<f64>() / polarities.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::DiscussionThread;

    fn scored(sentiment: f64, weight: f64) -> ScoredThread {
        ScoredThread {
            thread: DiscussionThread {
                id: "x".to_string(),
                title: String::new(),
                body: String::new(),
                score: 0,
                num_comments: 0,
                permalink: String::new(),
            },
            title_polarity: sentiment,
            comment_polarities: Vec::new(),
            sentiment,
            weight,
        }
    }

    #[test]
    fn test_engagement_weight() {
        assert!((engagement_weight(0, 0) - 1.0).abs() < 1e-12);
        assert!((engagement_weight(100, 50) - 3.0).abs() < 1e-12);
        assert!((engagement_weight(-300, 0) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_mean() {
        let threads = [scored(0.8, 2.0), scored(-0.2, 1.0)];
        let score = EngagementWeighted.aggregate(&threads).unwrap();
        assert!((score - 1.4 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_empty_and_non_positive_total() {
        assert_eq!(EngagementWeighted.aggregate(&[]), None);
        let threads = [scored(0.5, 1.0), scored(0.5, -1.0)];
        assert_eq!(EngagementWeighted.aggregate(&threads), None);
    }

    #[test]
    fn test_unweighted_mean_counts_comments() {
        let mut thread = scored(0.6, 5.0);
        thread.comment_polarities = vec![0.0, -0.3];
        assert!((UnweightedMean.aggregate(&[thread]).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(UnweightedMean.aggregate(&[]), None);
    }

    #[test]
    fn test_closure_is_a_policy() {
        let max = |threads: &[ScoredThread]| {
            threads.iter().map(|t| t.sentiment).reduce(f64::max)
        };
        let policy: &dyn AggregationPolicy = &max;
        let score = policy.aggregate(&[scored(0.2, 1.0), scored(0.7, 1.0)]).unwrap();
        assert!((score - 0.7).abs() < 1e-12);
        assert_eq!(policy.aggregate(&[]), None);
    }
}
