pub(crate) mod attempts;
pub(crate) mod catalog;
pub(crate) mod errors;
pub(crate) mod stats;

/// Trusted caller identity. Authentication happens upstream; by the time a
/// request reaches this crate the identity is a fact, not a claim.
#[derive(Debug, Clone)]
pub(crate) struct Identity {
    pub(crate) user_id: String,
    pub(crate) display_name: String,
}

/// What pushed an attempt out of `in_progress`: an explicit user submit or
/// the expiry sweeper.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FinalizeTrigger<'a> {
    User(&'a Identity),
    Expiry,
}
