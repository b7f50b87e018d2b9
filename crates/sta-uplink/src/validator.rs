// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Observation validation hook.

use crate::model::Observation;

/// Decides whether an observation may be forwarded.
///
/// Rejected observations are dropped silently by the uplink.
pub trait Validator: Send {
    fn is_valid(&self, obs: &Observation) -> bool;
}

/// Accepts every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn is_valid(&self, _obs: &Observation) -> bool {
        true
    }
}

impl<F> Validator for F
where
    F: Fn(&Observation) -> bool + Send,
{
    fn is_valid(&self, obs: &Observation) -> bool {
        self(obs)
    }
}
