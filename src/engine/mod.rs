//! Engine modules: the "brain" that translates a resolved profile and a
//! rendered configuration into collaborator requests.
//!
//! The engine layer sits between resolution (what the host needs) and the
//! collaborators that act on it. It generates ordered, validated plans.

pub mod plan;
