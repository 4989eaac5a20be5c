//! Agreement evaluation over corroborating responses.
//!
//! Stateless: callers pass the successful responses in roster order and get back a
//! [`Verdict`]. Values are compared with `PartialEq`; there is no hashing, so any
//! response type the router can return can be corroborated.

use super::config::CorroborationMode;
use std::sync::Arc;

/// Endpoints that returned the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueGroup<T> {
    pub value: T,
    pub endpoints: Vec<Arc<str>>,
}

impl<T> ValueGroup<T> {
    #[must_use]
    pub fn count(&self) -> usize {
        self.endpoints.len()
    }
}

/// Outcome of corroboration.
#[derive(Debug, PartialEq)]
pub enum Verdict<T> {
    /// A value met the agreement rule. `dissenters` returned something else.
    Accepted { value: T, agreeing: usize, dissenters: Vec<Arc<str>> },
    /// Responses disagreed and no value met the agreement rule.
    Inconsistent { groups: Vec<Vec<Arc<str>>> },
    /// Responses agreed, but too few arrived.
    QuorumUnavailable { responded: usize, required: usize },
}

/// Groups responses by value. Groups are ordered by first appearance, so with
/// responses in roster order the first group holds the lowest-index endpoint.
pub fn group_values<T: PartialEq>(responses: Vec<(Arc<str>, T)>) -> Vec<ValueGroup<T>> {
    let mut groups: Vec<ValueGroup<T>> = Vec::new();
    for (endpoint, value) in responses {
        match groups.iter_mut().find(|g| g.value == value) {
            Some(group) => group.endpoints.push(endpoint),
            None => groups.push(ValueGroup { value, endpoints: vec![endpoint] }),
        }
    }
    groups
}

/// Applies `mode` to the successful `responses` of a call that queried `queried`
/// endpoints. `required` is the minimum number of responses strict mode accepts.
pub fn evaluate<T: PartialEq>(
    mode: CorroborationMode,
    responses: Vec<(Arc<str>, T)>,
    queried: usize,
    required: usize,
) -> Verdict<T> {
    let responded = responses.len();
    let mut groups = group_values(responses);

    if groups.is_empty() {
        return Verdict::QuorumUnavailable { responded: 0, required };
    }

    match mode {
        CorroborationMode::Disabled => accept(groups, 0),
        CorroborationMode::Strict => {
            if groups.len() > 1 {
                Verdict::Inconsistent { groups: endpoint_groups(groups) }
            } else if responded < required {
                Verdict::QuorumUnavailable { responded, required }
            } else {
                accept(groups, 0)
            }
        }
        CorroborationMode::Majority => {
            let mut best = 0;
            for (i, group) in groups.iter().enumerate() {
                if group.count() > groups[best].count() {
                    best = i;
                }
            }

            if groups[best].count() * 2 > queried {
                accept(groups, best)
            } else if groups.len() > 1 {
                groups.sort_by_key(|g| std::cmp::Reverse(g.count()));
                Verdict::Inconsistent { groups: endpoint_groups(groups) }
            } else {
                Verdict::QuorumUnavailable { responded, required: queried / 2 + 1 }
            }
        }
    }
}

fn accept<T>(mut groups: Vec<ValueGroup<T>>, winner: usize) -> Verdict<T> {
    let group = groups.swap_remove(winner);
    let dissenters = groups.into_iter().flat_map(|g| g.endpoints).collect();
    Verdict::Accepted { agreeing: group.count(), value: group.value, dissenters }
}

fn endpoint_groups<T>(groups: Vec<ValueGroup<T>>) -> Vec<Vec<Arc<str>>> {
    groups.into_iter().map(|g| g.endpoints).collect()
}
