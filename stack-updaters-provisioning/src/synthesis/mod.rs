//! Policy synthesis (deterministic JSON generation)

pub mod policy_builder;

pub use policy_builder::{
    build_assume_role_policy, build_default_assume_role_policy, render_assume_role_policy,
};
