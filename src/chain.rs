// SPDX-License-Identifier: PMPL-1.0-or-later

//! Randomized call chains.
//!
//! A crash reporter groups reports by the frames it blames. Entering a probe
//! through a random path of named frames keeps those groupings varied across
//! runs, the way a real application crashes from many call sites.

use crate::types::ProbeAction;
use rand::seq::SliceRandom;
use rand::Rng;
use std::hint::black_box;

pub const MIN_DEPTH: usize = 3;
pub const MAX_DEPTH: usize = 8;

/// One named, never-inlined stack frame
pub struct Frame {
    pub name: &'static str,
    enter: fn(ProbeAction, &[&'static Frame]) -> !,
}

// Each frame pins a distinct constant on its own stack so identical-code
// folding cannot merge the frames and the call cannot become a tail jump.
macro_rules! frames {
    ($table:ident: $($name:ident),+ $(,)?) => {
        $(
            #[inline(never)]
            fn $name(action: ProbeAction, rest: &[&'static Frame]) -> ! {
                let frame_tag = stringify!($name);
                black_box(&frame_tag);
                descend(action, rest)
            }
        )+

        static $table: &[Frame] = &[$(Frame { name: stringify!($name), enter: $name }),+];
    };
}

frames! { CHAIN_FRAMES:
    // UI flow
    handle_user_interaction,
    process_view_update,
    layout_subview_hierarchy,
    render_visible_content,
    // Data/network
    fetch_remote_resource,
    process_network_response,
    deserialize_payload,
    validate_response_integrity,
    // Business logic
    apply_business_rules,
    compute_derived_state,
    resolve_conflicts,
    transform_data_model,
    // Storage
    persist_to_local_store,
    synchronize_with_backend,
    migrate_schema_version,
    index_searchable_content,
    // Auth/session
    refresh_session_token,
    validate_user_permissions,
    decrypt_secure_payload,
    audit_access_log,
}

frames! { TRIGGER_WRAPPERS:
    commit_transaction,
    flush_pending_updates,
    finalize_event_payload,
    process_incoming_message,
    apply_configuration_change,
}

fn descend(action: ProbeAction, rest: &[&'static Frame]) -> ! {
    match rest.split_first() {
        Some((next, tail)) => (next.enter)(action, tail),
        None => action(),
    }
}

/// Planned path from the driver down to a probe body
#[derive(Default)]
pub struct CallChain {
    frames: Vec<&'static Frame>,
}

impl CallChain {
    /// Random path of `MIN_DEPTH..=MAX_DEPTH` frames plus one trigger wrapper
    pub fn plan<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let depth = rng.gen_range(MIN_DEPTH..=MAX_DEPTH);
        let mut frames: Vec<&'static Frame> = (0..depth)
            .filter_map(|_| CHAIN_FRAMES.choose(rng))
            .collect();
        frames.extend(TRIGGER_WRAPPERS.choose(rng));
        Self { frames }
    }

    /// No intermediate frames; the probe runs straight from the caller
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_names(&self) -> Vec<&'static str> {
        self.frames.iter().map(|f| f.name).collect()
    }

    pub fn run(&self, action: ProbeAction) -> ! {
        descend(action, &self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_wrapper(name: &str) -> bool {
        TRIGGER_WRAPPERS.iter().any(|f| f.name == name)
    }

    #[test]
    fn test_frame_tables() {
        assert_eq!(CHAIN_FRAMES.len(), 20);
        assert_eq!(TRIGGER_WRAPPERS.len(), 5);
        assert_eq!(CHAIN_FRAMES[0].name, "handle_user_interaction");
    }

    #[test]
    fn test_plan_depth_and_trailing_wrapper() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..200 {
            let chain = CallChain::plan(&mut rng);
            let names = chain.frame_names();
            assert!(names.len() > MIN_DEPTH && names.len() <= MAX_DEPTH + 1);
            assert!(is_wrapper(names[names.len() - 1]));
            assert!(names[..names.len() - 1].iter().all(|n| !is_wrapper(n)));
        }
    }

    #[test]
    fn test_plans_vary() {
        let mut rng = StdRng::seed_from_u64(5);
        let first = CallChain::plan(&mut rng).frame_names();
        let differs = (0..20).any(|_| CallChain::plan(&mut rng).frame_names() != first);
        assert!(differs);
    }

    #[test]
    fn test_direct_chain_is_empty() {
        let chain = CallChain::direct();
        assert!(chain.is_empty());
        assert!(chain.frame_names().is_empty());
    }
}
