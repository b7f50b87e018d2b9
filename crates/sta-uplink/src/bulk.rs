// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bulk submission of accumulated batches.
//!
//! All pending batches go out in a single DataArray request. The service
//! answers with one entry per observation; entries starting with `error`
//! are counted as failures. Failed observations are not retried: once a
//! flush returns, the accumulator is empty whatever the outcome.

use crate::buffer::BatchAccumulator;
use crate::data_array::DataArrayDocument;
use crate::service::{ItemResult, ServiceClient, ServiceError};
use crate::uplink::Counters;
use tracing::warn;

/// Outcome of a flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Observations drained from the accumulator.
    pub submitted: usize,
    /// Items the service reported as created.
    pub inserted: usize,
    /// Items the service reported as failed.
    pub failed: usize,
    /// Text of the first failed item.
    pub first_error: Option<String>,
    /// Per-item results in submission order. Empty when nothing was sent.
    pub results: Vec<ItemResult>,
    /// Nothing was sent because dry-run is active.
    pub dry_run: bool,
}

/// Send every pending batch in one request and reconcile the results.
///
/// Does nothing but clear the accumulator when `dry_run` is set or there
/// is nothing to send. An error from the request itself is returned after
/// the batches have been discarded.
pub fn flush(
    accumulator: &mut BatchAccumulator,
    client: &mut dyn ServiceClient,
    counters: &mut Counters,
    dry_run: bool,
) -> Result<FlushReport, ServiceError> {
    let batches = accumulator.drain();
    let document = DataArrayDocument::new(&batches);
    let submitted = document.observation_count();

    if dry_run || batches.is_empty() {
        return Ok(FlushReport {
            submitted,
            dry_run,
            ..Default::default()
        });
    }

    let locations = client.create_bulk(&document)?;
    if locations.len() != submitted {
        warn!(
            "Service returned {} results for {} submitted Observations",
            locations.len(),
            submitted
        );
    }

    let results: Vec<ItemResult> = locations.into_iter().map(ItemResult::from_location).collect();
    let failed = results.iter().filter(|r| r.is_error()).count();
    let first_error = results.iter().find_map(|r| match r {
        ItemResult::Failed(msg) => Some(msg.clone()),
        ItemResult::Created(_) => None,
    });

    if let Some(first) = &first_error {
        warn!(
            "Failed to insert {} Observations. First error: {}",
            failed, first
        );
    }

    let inserted = results.len() - failed;
    counters.inserted += inserted as u64;

    Ok(FlushReport {
        submitted,
        inserted,
        failed,
        first_error,
        results,
        dry_run: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::model::{EntityId, Observation, Thing};
    use url::Url;

    /// Records bulk requests and answers with a canned result list.
    #[derive(Default)]
    struct CannedClient {
        answer: Vec<String>,
        fail: bool,
        bulk_calls: usize,
        sent_rows: Vec<usize>,
    }

    impl ServiceClient for CannedClient {
        fn configure(&mut self, _: &Url, _: Option<&AuthConfig>) -> Result<(), ServiceError> {
            Ok(())
        }

        fn create(&mut self, _: &Observation) -> Result<EntityId, ServiceError> {
            unreachable!("bulk flush never creates singly")
        }

        fn update(&mut self, _: &Observation) -> Result<(), ServiceError> {
            unreachable!("bulk flush never updates")
        }

        fn create_bulk(&mut self, doc: &DataArrayDocument<'_>) -> Result<Vec<String>, ServiceError> {
            self.bulk_calls += 1;
            self.sent_rows.push(doc.observation_count());
            if self.fail {
                return Err(ServiceError::Unavailable("connection refused".into()));
            }
            Ok(self.answer.clone())
        }

        fn things(&mut self) -> Result<Vec<Thing>, ServiceError> {
            Ok(Vec::new())
        }
    }

    fn accumulator_with(n: i64) -> BatchAccumulator {
        let mut acc = BatchAccumulator::new();
        for v in 0..n {
            acc.add(Observation::new(v).for_datastream("A")).unwrap();
        }
        acc
    }

    #[test]
    fn test_partial_failure_counts_successes() {
        let mut acc = accumulator_with(3);
        let mut client = CannedClient {
            answer: vec!["loc1".into(), "error: duplicate".into(), "loc3".into()],
            ..Default::default()
        };
        let mut counters = Counters::default();

        let report = flush(&mut acc, &mut client, &mut counters, false).expect("flush");

        assert_eq!(report.submitted, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.first_error.as_deref(), Some("error: duplicate"));
        assert_eq!(report.results[1], ItemResult::Failed("error: duplicate".into()));
        assert_eq!(counters.inserted, 2);
        assert!(acc.is_empty());
        assert!(acc.cached_stream().is_none());
    }

    #[test]
    fn test_empty_flush_makes_no_call() {
        let mut acc = BatchAccumulator::new();
        let mut client = CannedClient::default();
        let mut counters = Counters::default();

        let report = flush(&mut acc, &mut client, &mut counters, false).expect("flush");

        assert_eq!(client.bulk_calls, 0);
        assert_eq!(report, FlushReport::default());
        assert_eq!(counters.inserted, 0);
    }

    #[test]
    fn test_dry_run_discards_without_call() {
        let mut acc = accumulator_with(4);
        let mut client = CannedClient::default();
        let mut counters = Counters::default();

        let report = flush(&mut acc, &mut client, &mut counters, true).expect("flush");

        assert_eq!(client.bulk_calls, 0);
        assert!(report.dry_run);
        assert_eq!(report.submitted, 4);
        assert_eq!(report.inserted, 0);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_request_failure_propagates_and_drops_batches() {
        let mut acc = accumulator_with(2);
        let mut client = CannedClient {
            fail: true,
            ..Default::default()
        };
        let mut counters = Counters::default();

        let err = flush(&mut acc, &mut client, &mut counters, false).unwrap_err();

        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert_eq!(client.sent_rows, vec![2]);
        assert!(acc.is_empty());
        assert_eq!(counters.inserted, 0);
    }
}
